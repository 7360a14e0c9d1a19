use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use crate::entity::{Entity, KeyFilter, Relation, Value, Votable};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("{0}")] Validation(String),
    #[error("storage: {0}")] Storage(#[from] sqlx::Error),
    #[error("migration: {0}")] Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type RepoResult<T> = Result<T, RepoError>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed storage handle. Cheap to clone; every clone shares the pool.
#[derive(Clone)]
pub struct SqliteRepo { pool: SqlitePool }

impl SqliteRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    /// Opens (creating if missing) a database file in WAL mode.
    pub async fn connect(url: &str, max_connections: u32) -> RepoResult<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        info!(url, max_connections, "sqlite pool ready");
        Ok(Self::new(pool))
    }

    /// Private, migrated in-memory database. The single connection is never
    /// recycled, since closing it drops the data.
    pub async fn in_memory() -> RepoResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(opts)
            .await?;
        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool { &self.pool }

    /// Inserts `value` as a live row with no votes. The parent row, if any,
    /// must be live.
    pub async fn create<T: Entity>(&self, mut value: T) -> RepoResult<T> {
        T::key_filter(&value.key()).ensure_complete()?;
        value.reset_lifecycle();
        let row = value.row();

        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", T::TABLE));
        for (i, (column, _)) in row.iter().enumerate() {
            if i > 0 { qb.push(", "); }
            qb.push(*column);
        }
        qb.push(") SELECT ");
        for (i, (_, v)) in row.into_iter().enumerate() {
            if i > 0 { qb.push(", "); }
            push_value(&mut qb, v);
        }
        if let Some((table, parent)) = value.parent() {
            parent.ensure_complete()?;
            qb.push(format!(" WHERE EXISTS (SELECT 1 FROM {table}"));
            push_live_filter(&mut qb, &parent);
            qb.push(")");
        }

        let done = qb.build().execute(&self.pool).await.map_err(map_write_error)?;
        if done.rows_affected() == 0 {
            debug!(table = T::TABLE, "create rejected: parent missing or deleted");
            return Err(RepoError::NotFound);
        }
        debug!(table = T::TABLE, "created row");
        Ok(value)
    }

    /// Fetches one live row and loads each requested child collection.
    pub async fn get<T: Entity>(&self, key: &T::Key, expand: &[Relation]) -> RepoResult<T> {
        let filter = T::key_filter(key);
        filter.ensure_complete()?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE));
        push_live_filter(&mut qb, &filter);
        qb.push(" LIMIT 1");
        let mut found = qb
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)?;
        for relation in expand {
            found.expand(self, *relation).await?;
        }
        Ok(found)
    }

    /// Writes the fields present in `patch` and returns the stored row.
    pub async fn update<T: Entity>(&self, key: &T::Key, patch: &T::Patch) -> RepoResult<T> {
        let filter = T::key_filter(key);
        filter.ensure_complete()?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", T::TABLE));
        for (column, v) in T::assignments(patch) {
            qb.push(column).push(" = ");
            push_value(&mut qb, v);
            qb.push(", ");
        }
        qb.push("updated_at = ").push_bind(Utc::now());
        push_live_filter(&mut qb, &filter);
        qb.push(format!(" RETURNING {}", T::COLUMNS));
        let updated = qb
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(RepoError::NotFound)?;
        debug!(table = T::TABLE, "updated row");
        Ok(updated)
    }

    /// Live rows within `scope`, oldest insert first.
    pub async fn list<T: Entity>(&self, scope: &T::Scope) -> RepoResult<Vec<T>> {
        let filter = T::scope_filter(scope);
        filter.ensure_complete()?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE));
        push_live_filter(&mut qb, &filter);
        qb.push(" ORDER BY rowid");
        let rows = qb.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Marks the row and its live descendants deleted; returns the row.
    pub async fn delete<T: Entity>(&self, key: &T::Key) -> RepoResult<T> {
        let filter = T::key_filter(key);
        filter.ensure_complete()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET deleted_at = ", T::TABLE));
        qb.push_bind(now);
        push_live_filter(&mut qb, &filter);
        qb.push(format!(" RETURNING {}", T::COLUMNS));
        let deleted = qb
            .build_query_as::<T>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepoError::NotFound)?;

        for (table, children) in T::children(key) {
            let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {table} SET deleted_at = "));
            qb.push_bind(now);
            push_live_filter(&mut qb, &children);
            let done = qb.build().execute(&mut *tx).await?;
            debug!(table, rows = done.rows_affected(), "cascaded soft delete");
        }
        tx.commit().await?;
        debug!(table = T::TABLE, "soft deleted row");
        Ok(deleted)
    }

    /// Adds `delta` to the vote counter in a single statement.
    pub async fn vote<T: Votable>(&self, key: &T::Key, delta: i64) -> RepoResult<()> {
        let filter = T::key_filter(key);
        filter.ensure_complete()?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET votes = votes + ", T::TABLE));
        qb.push_bind(delta);
        qb.push(", updated_at = ").push_bind(Utc::now());
        push_live_filter(&mut qb, &filter);
        let done = qb.build().execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        debug!(table = T::TABLE, delta, "vote applied");
        Ok(())
    }

    pub async fn upvote<T: Votable>(&self, key: &T::Key) -> RepoResult<()> {
        self.vote::<T>(key, 1).await
    }

    pub async fn downvote<T: Votable>(&self, key: &T::Key) -> RepoResult<()> {
        self.vote::<T>(key, -1).await
    }
}

fn push_live_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &KeyFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    for (column, v) in filter.columns() {
        qb.push(" AND ").push(*column).push(" = ").push_bind(v.clone());
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: Value) {
    match value {
        Value::Text(s) => qb.push_bind(s),
        Value::Integer(i) => qb.push_bind(i),
        Value::Timestamp(t) => qb.push_bind(t),
        Value::NullableTimestamp(t) => qb.push_bind(t),
    };
}

fn map_write_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() { return RepoError::Conflict; }
        if db.is_foreign_key_violation() { return RepoError::NotFound; }
    }
    RepoError::Storage(e)
}
