use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, Pool, Postgres, QueryBuilder, Row, postgres::PgPoolOptions};

use crate::domain::{
    models::{HistoryPage, HistoryQuery, HistoryRecord, NewHistoryRecord},
    repositories::HistoryRepository,
};

pub type PgPool = Pool<Postgres>;

const HISTORY_COLUMNS: &str = "id, message, err, req, resp, status, received_at, created_at";

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct PostgresHistoryRepository {
    pool: PgPool,
}

impl PostgresHistoryRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl HistoryRepository for PostgresHistoryRepository {
    async fn insert(&self, record: NewHistoryRecord) -> anyhow::Result<HistoryRecord> {
        let row = sqlx::query_as::<_, HistoryRow>(&format!(
            r#"
            INSERT INTO history (message, err, req, resp, status, received_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {HISTORY_COLUMNS}
            "#
        ))
        .bind(&record.message)
        .bind(&record.err)
        .bind(&record.req)
        .bind(&record.resp)
        .bind(record.status)
        .bind(record.received_at)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn query(&self, query: &HistoryQuery) -> anyhow::Result<HistoryPage> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM history");
        push_filters(&mut count, query);

        let mut list = QueryBuilder::new(format!("SELECT {HISTORY_COLUMNS} FROM history"));
        push_filters(&mut list, query);
        list.push(" ORDER BY id DESC LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let (count, rows) = tokio::try_join!(
            count.build().fetch_one(&self.pool),
            list.build_query_as::<HistoryRow>().fetch_all(&self.pool),
        )?;

        Ok(HistoryPage {
            count: count.try_get::<i64, _>(0)?.max(0) as u64,
            list: rows.into_iter().map(HistoryRecord::from).collect(),
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &HistoryQuery) {
    builder.push(" WHERE TRUE");
    if let Some(start) = query.start {
        builder.push(" AND received_at >= ").push_bind(start);
    }
    if let Some(end) = query.end {
        builder.push(" AND received_at <= ").push_bind(end);
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    for (field, needle) in [("sender", &query.sender), ("content", &query.content)] {
        if let Some(needle) = needle {
            builder
                .push(format!(" AND (message::jsonb ->> '{field}') LIKE "))
                .push_bind(format!("%{needle}%"));
        }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: i64,
    message: String,
    err: String,
    req: String,
    resp: String,
    status: bool,
    received_at: i64,
    created_at: i64,
}

impl From<HistoryRow> for HistoryRecord {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            message: row.message,
            err: row.err,
            req: row.req,
            resp: row.resp,
            status: row.status,
            received_at: row.received_at,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_bind_every_value() {
        let query = HistoryQuery {
            page_index: 1,
            page_size: 10,
            start: Some(1),
            status: Some(false),
            sender: Some("bot".to_string()),
            ..Default::default()
        };
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM history");
        push_filters(&mut builder, &query);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM history WHERE TRUE AND received_at >= $1 AND status = $2 \
             AND (message::jsonb ->> 'sender') LIKE $3"
        );
    }

    #[test]
    fn no_filters_means_no_binds() {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM history");
        push_filters(&mut builder, &HistoryQuery::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM history WHERE TRUE");
    }
}
