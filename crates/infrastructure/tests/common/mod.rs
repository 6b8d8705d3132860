// Shared PostgreSQL container for integration tests.
// Un solo contenedor por proceso, una base de datos por test.

use flashplane_infrastructure::persistence::{connect, run_migrations};
use flashplane_shared::config::DatabaseConfig;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

struct SharedPostgres {
    _container: ContainerAsync<Postgres>,
    admin_url: String,
    host: String,
    port: u16,
}

static POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();

pub struct TestDatabase {
    pub pool: PgPool,
    db_name: String,
    admin_url: String,
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let db_name = self.db_name.clone();
        let admin_url = self.admin_url.clone();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        handle.spawn(async move {
            let Ok(mut conn) = PgConnection::connect(&admin_url).await else {
                return;
            };
            let _ = sqlx::query(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
            )
            .bind(&db_name)
            .execute(&mut conn)
            .await;
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS {db_name}"))
                .execute(&mut conn)
                .await;
        });
    }
}

async fn shared_postgres() -> &'static SharedPostgres {
    POSTGRES
        .get_or_init(|| async {
            let container = Postgres::default()
                .with_tag("16-alpine")
                .start()
                .await
                .expect("Failed to start Postgres container");

            let host = container
                .get_host()
                .await
                .expect("Failed to get host")
                .to_string();
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("Failed to get port");

            SharedPostgres {
                _container: container,
                admin_url: format!("postgres://postgres:postgres@{host}:{port}/postgres"),
                host,
                port,
            }
        })
        .await
}

/// Fresh database with the schema already migrated
pub async fn test_database() -> TestDatabase {
    let shared = shared_postgres().await;
    let db_name = format!("test_{}", Uuid::new_v4().simple());

    let mut conn = PgConnection::connect(&shared.admin_url)
        .await
        .expect("Failed to connect to postgres admin db");
    sqlx::query(&format!("CREATE DATABASE {db_name}"))
        .execute(&mut conn)
        .await
        .expect("Failed to create test database");

    let config = DatabaseConfig {
        url: format!(
            "postgres://postgres:postgres@{}:{}/{}",
            shared.host, shared.port, db_name
        ),
        max_connections: 5,
        connection_timeout_secs: 30,
    };
    let pool = connect(&config).await.expect("Failed to connect");
    run_migrations(&pool).await.expect("Failed to run migrations");

    TestDatabase {
        pool,
        db_name,
        admin_url: shared.admin_url.clone(),
    }
}
