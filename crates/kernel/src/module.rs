use async_trait::async_trait;
use axum::Router;

/// What a module sees while the service boots.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// A MongoDB command contributed by a module, run once per boot.
///
/// `up` is the command as a JSON object (for example `createIndexes`), with
/// the command name as its first key. It runs on every start, so it must be
/// idempotent.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A self-contained slice of the HTTP API and its storage needs.
///
/// Boot order is `init` → migrations → `start` → serve; `stop` runs after
/// the server has drained, in reverse registration order.
#[async_trait]
pub trait Module: Sync + Send {
    /// Mount path segment: a module named `books` serves `/books`.
    fn name(&self) -> &'static str;

    /// Runs before any migration; storage may not be indexed yet.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to the mount path, with state already applied.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` relative to the mount path, plus
    /// `components.schemas`) merged into `/docs/openapi.json`.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Skipped entirely on the in-memory backend.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
