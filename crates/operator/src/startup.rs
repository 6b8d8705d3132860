//! Startup sequence: database, migrations, Kubernetes client, reconciler.

use anyhow::{Context, Result};
use flashplane_application::ReconciliationLoop;
use flashplane_infrastructure::persistence::{PostgresJobRepository, connect, run_migrations};
use flashplane_infrastructure::providers::{KubeWorkloadClient, create_client};
use flashplane_shared::config::PlatformConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub skip_migrations: bool,
}

/// Running operator. Dropping it does not stop the reconciler; call `shutdown`.
pub struct Operator {
    shutdown: CancellationToken,
    reconciler: JoinHandle<()>,
}

impl Operator {
    pub async fn start(config: &PlatformConfig, options: &StartupOptions) -> Result<Self> {
        let pool = connect(&config.database)
            .await
            .context("Failed to connect to database")?;
        info!("Database connected");

        if options.skip_migrations {
            info!("Skipping migrations");
        } else {
            run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
        }

        let client = create_client(&config.kubernetes)
            .await
            .context("Failed to create Kubernetes client")?;
        info!("Connected to Kubernetes");

        let workloads = Arc::new(KubeWorkloadClient::new(client, &config.kubernetes));
        let jobs = Arc::new(PostgresJobRepository::new(pool));
        let reconciler =
            ReconciliationLoop::new(workloads, jobs, config.reconciler.clone());

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let reconciler = tokio::spawn(async move { reconciler.run(token).await });

        Ok(Self {
            shutdown,
            reconciler,
        })
    }

    /// Cancels the reconciler and waits for it to return
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.reconciler
            .await
            .context("Reconciler task panicked")?;
        info!("Operator stopped");
        Ok(())
    }
}
