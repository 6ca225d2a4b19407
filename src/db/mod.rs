//! Persistence layer: hand-written queries over [`sqlx::Any`], so the same
//! query text runs unmodified against either `sqlite://` or `postgresql://`
//! — the backend is resolved once, from `DATABASE_URI`'s scheme, at
//! startup.

pub mod log;
pub mod reservation;
pub mod sdp;
pub mod stp;

use anyhow::{Context, bail};
use sqlx::AnyPool;
use sqlx::any::install_default_drivers;

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to whichever backend `uri`'s scheme names. Fails fast on any
    /// other scheme, per the configuration contract.
    pub async fn connect(uri: &str) -> anyhow::Result<Self> {
        if !uri.starts_with("sqlite://") && !uri.starts_with("postgresql://") {
            bail!("unsupported DATABASE_URI scheme: {uri}");
        }

        install_default_drivers();
        let pool = AnyPool::connect(uri)
            .await
            .with_context(|| format!("connecting to database at {uri}"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Create the five tables if they don't already exist. Idempotent, run
    /// on every startup.
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stp (
                id INTEGER PRIMARY KEY,
                stp_id TEXT UNIQUE NOT NULL,
                inbound_port TEXT,
                outbound_port TEXT,
                inbound_alias TEXT,
                outbound_alias TEXT,
                vlan_range TEXT NOT NULL,
                description TEXT,
                active INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sdp (
                id INTEGER PRIMARY KEY,
                stp_a_id INTEGER NOT NULL,
                stp_z_id INTEGER NOT NULL,
                vlan_range TEXT NOT NULL,
                description TEXT,
                active INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reservation (
                id INTEGER PRIMARY KEY,
                connection_id TEXT,
                global_reservation_id TEXT NOT NULL,
                correlation_id TEXT NOT NULL,
                description TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                source_stp_id INTEGER NOT NULL,
                dest_stp_id INTEGER NOT NULL,
                source_vlan INTEGER NOT NULL,
                dest_vlan INTEGER NOT NULL,
                bandwidth INTEGER NOT NULL,
                state TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reservation_sdp_link (
                reservation_id INTEGER NOT NULL,
                sdp_id INTEGER NOT NULL,
                PRIMARY KEY (reservation_id, sdp_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS log (
                id INTEGER PRIMARY KEY,
                reservation_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                message TEXT NOT NULL,
                module TEXT,
                function TEXT,
                line INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reservation_connection_id ON reservation(connection_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reservation_correlation_id ON reservation(correlation_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Used by the `/api/healthcheck/` endpoint.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
