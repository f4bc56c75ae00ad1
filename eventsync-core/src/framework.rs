use sqlx::PgPool;

/// Runs the `kanau` database processors against a connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
