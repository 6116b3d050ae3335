//! MongoDB connection and migration helpers.
//!
//! The client is created once at startup; the returned [`Database`] handle is
//! cheap to clone and shared by every request.

use anyhow::{anyhow, Context};
use mongodb::{
    bson::{doc, Document},
    Client, Database,
};

use shelf_kernel::{settings::DatabaseSettings, Migration};

/// Connect to the configured deployment and return the database handle.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Database> {
    tracing::info!(
        target: "shelf-db",
        endpoint = %settings.endpoint,
        database = %settings.database,
        "connecting to MongoDB"
    );

    let client = Client::with_uri_str(&settings.endpoint)
        .await
        .with_context(|| format!("failed to create MongoDB client for {}", settings.endpoint))?;

    Ok(client.database(&settings.database))
}

/// Round-trip a `ping` command to verify the deployment is reachable.
pub async fn ping(db: &Database) -> anyhow::Result<()> {
    db.run_command(doc! { "ping": 1 })
        .await
        .with_context(|| format!("database '{}' did not answer ping", db.name()))?;
    Ok(())
}

/// Execute module migrations in order. Each `up` is a JSON command document.
pub async fn apply_migrations(
    db: &Database,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    for (module, migration) in migrations {
        let command = parse_command(migration.up)
            .with_context(|| format!("invalid migration {}/{}", module, migration.id))?;

        db.run_command(command)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

        tracing::info!(
            target: "shelf-db",
            module = %module,
            migration = migration.id,
            "migration applied"
        );
    }

    Ok(())
}

/// Parse a JSON command into a BSON document.
pub fn parse_command(up: &str) -> anyhow::Result<Document> {
    let json: serde_json::Value = serde_json::from_str(up).context("migration is not JSON")?;
    match mongodb::bson::to_bson(&json)? {
        mongodb::bson::Bson::Document(command) => Ok(command),
        other => Err(anyhow!("migration must be a JSON object, got {}", other)),
    }
}
