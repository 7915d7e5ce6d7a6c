//! Durable job queue backed by sea-orm.
//!
//! Writes are scoped to a single row: creation inserts one job, transitions
//! update one job only while its status still matches what the caller last
//! saw. Nothing ever rewrites the whole queue, so two jobs finishing together
//! cannot clobber each other, and a job removed by `clear` is never recreated.

use sea_orm::sea_query::OnConflict;
use sea_orm::sqlx::sqlite::SqlitePoolOptions;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, RuntimeErr, Schema, SqlxSqliteConnector, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{job, stats};
use crate::error::StoreError;
use crate::estimator;
use crate::models::{Job, JobStatus, ParsedResult, ScrapedJobData, Stats};

const STATS_ROW: i32 = 1;

#[derive(Clone)]
pub struct JobStore {
    db: DatabaseConnection,
}

impl JobStore {
    /// Open (creating if needed) the store at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(url.to_owned());
        // one connection: SQLite writes serialise on it, and `sqlite::memory:` stays one database
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await?;
        let store = JobStore { db };
        store.ensure_schema().await?;
        tracing::info!("Job store ready at {}", url);
        Ok(store)
    }

    /// Throwaway store, handy for tests and dry runs.
    ///
    /// The database lives and dies with its one connection, so the pool is
    /// told never to retire it for age or idleness.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DbErr::Conn(RuntimeErr::SqlxError(e)))?;
        let store = JobStore {
            db: SqlxSqliteConnector::from_sqlx_sqlite_pool(pool),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// The underlying connection, for maintenance statements the store has no call for.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut jobs_table = schema.create_table_from_entity(job::Entity);
        jobs_table.if_not_exists();
        self.db.execute(backend.build(&jobs_table)).await?;

        let mut stats_table = schema.create_table_from_entity(stats::Entity);
        stats_table.if_not_exists();
        self.db.execute(backend.build(&stats_table)).await?;

        let seed = stats::ActiveModel {
            id: Set(STATS_ROW),
            count: Set(0),
            avg_time_sec: Set(Stats::default().avg_time_sec),
        };
        stats::Entity::insert(seed)
            .on_conflict(OnConflict::column(stats::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    pub async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let model = job::ActiveModel {
            id: Set(job.id.to_string()),
            status: Set(job.status.as_str().to_string()),
            original_text: Set(job.original_text.clone()),
            scraped_meta: Set(serde_json::to_string(&job.scraped_meta)?),
            parsed_result: Set(encode_parsed(job)?),
            created_at: Set(job.created_at),
            error_msg: Set(job.error_msg.clone()),
            remote_task_id: Set(job.remote_task_id.clone()),
        };
        job::Entity::insert(model).exec_without_returning(&self.db).await?;
        Ok(())
    }

    /// Write the mutable fields of `job`, but only if the stored row still has
    /// status `expected`. Returns `false` when nothing was written (the row was
    /// cleared, or another writer moved it on).
    pub async fn transition(&self, job: &Job, expected: JobStatus) -> Result<bool, StoreError> {
        let changes = job::ActiveModel {
            status: Set(job.status.as_str().to_string()),
            parsed_result: Set(encode_parsed(job)?),
            error_msg: Set(job.error_msg.clone()),
            remote_task_id: Set(job.remote_task_id.clone()),
            ..Default::default()
        };
        let result = job::Entity::update_many()
            .set(changes)
            .filter(job::Column::Id.eq(job.id.to_string()))
            .filter(job::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        job::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(decode_job)
            .transpose()
    }

    /// Every job, newest first.
    pub async fn all(&self) -> Result<Vec<Job>, StoreError> {
        job::Entity::find()
            .order_by_desc(job::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(decode_job)
            .collect()
    }

    /// Remove every job. Returns how many were removed.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let result = job::Entity::delete_many().exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    pub async fn stats(&self) -> Result<Stats, StoreError> {
        let row = stats::Entity::find_by_id(STATS_ROW).one(&self.db).await?;
        Ok(row.map(stats_from_row).unwrap_or_default())
    }

    /// Fold a parse duration into the stored rolling average.
    pub async fn record_duration(&self, duration_sec: f64) -> Result<Stats, StoreError> {
        let txn = self.db.begin().await?;
        let current = stats::Entity::find_by_id(STATS_ROW)
            .one(&txn)
            .await?
            .map(stats_from_row)
            .unwrap_or_default();
        let updated = estimator::record(current, duration_sec);

        let row = stats::ActiveModel {
            id: Set(STATS_ROW),
            count: Set(updated.count as i64),
            avg_time_sec: Set(updated.avg_time_sec),
        };
        stats::Entity::insert(row)
            .on_conflict(
                OnConflict::column(stats::Column::Id)
                    .update_columns([stats::Column::Count, stats::Column::AvgTimeSec])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;
        Ok(updated)
    }
}

fn encode_parsed(job: &Job) -> Result<Option<String>, StoreError> {
    job.parsed_result
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

fn decode_job(model: job::Model) -> Result<Job, StoreError> {
    let corrupt = |message: String| StoreError::Corrupt {
        id: model.id.clone(),
        message,
    };
    let id = Uuid::parse_str(&model.id).map_err(|e| corrupt(e.to_string()))?;
    let status: JobStatus = model.status.parse().map_err(corrupt)?;
    let scraped_meta: ScrapedJobData =
        serde_json::from_str(&model.scraped_meta).map_err(|e| corrupt(e.to_string()))?;
    let parsed_result: Option<ParsedResult> = model
        .parsed_result
        .as_deref()
        .map(|raw| serde_json::from_str::<ParsedResult>(raw))
        .transpose()
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(Job {
        id,
        status,
        original_text: model.original_text,
        scraped_meta,
        parsed_result,
        created_at: model.created_at,
        error_msg: model.error_msg,
        remote_task_id: model.remote_task_id,
    })
}

fn stats_from_row(row: stats::Model) -> Stats {
    Stats {
        count: row.count.max(0) as u64,
        avg_time_sec: row.avg_time_sec,
    }
}
