//! Facility records browser
//!
//! Read-only paginated view over the party/activity registry tables.
//! Only tables listed in [`RECORD_TABLES`] are reachable.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use mt_common::Error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, ValueRef};

use super::ApiError;
use crate::AppState;

/// Rows per page
pub const PAGE_SIZE: i64 = 100;

/// Tables exposed through `/api/records/:table`
pub const RECORD_TABLES: [&str; 9] = [
    "name_parts",
    "party_records",
    "party_locations",
    "party_descriptions",
    "activity_records",
    "activity_party_relations",
    "activity_locations",
    "activity_descriptions",
    "publish_authorisations",
];

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// 1-indexed, clamped to the last page
    #[serde(default = "default_page")]
    pub page: i64,
    pub sort: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordsPage {
    pub table: String,
    pub total_rows: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// GET /api/records/:table
pub async fn get_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsPage>, ApiError> {
    if !RECORD_TABLES.contains(&table.as_str()) {
        return Err(Error::InvalidInput(format!("Unknown records table: {}", table)).into());
    }

    let pool = state.store.pool();
    let columns = table_columns(pool, &table).await?;

    let total_rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;

    let total_pages = (total_rows + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = query.page.clamp(1, total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    let mut sql = format!("SELECT * FROM {}", table);
    if let Some(sort) = &query.sort {
        if !columns.iter().any(|c| c == sort) {
            return Err(Error::InvalidInput(format!("Invalid sort column: {}", sort)).into());
        }
        sql.push_str(&format!(" ORDER BY {} {}", sort, query.order.as_sql()));
    } else {
        sql.push_str(" ORDER BY id ASC");
    }
    sql.push_str(&format!(" LIMIT {} OFFSET {}", PAGE_SIZE, offset));

    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    Ok(Json(RecordsPage {
        table,
        total_rows,
        page,
        page_size: PAGE_SIZE,
        total_pages,
        columns,
        rows: rows.iter().map(row_to_json).collect(),
    }))
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, ApiError> {
    // PRAGMA table_info: (cid, name, type, notnull, dflt_value, pk)
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get::<String, _>(1)).collect())
}

fn row_to_json(row: &SqliteRow) -> Vec<Value> {
    (0..row.columns().len())
        .map(|i| {
            match row.try_get_raw(i) {
                Ok(raw) if raw.is_null() => Value::Null,
                Ok(_) => row
                    .try_get::<i64, _>(i)
                    .map(|v| json!(v))
                    .or_else(|_| row.try_get::<f64, _>(i).map(|v| json!(v)))
                    .or_else(|_| row.try_get::<String, _>(i).map(Value::String))
                    .unwrap_or(Value::Null),
                Err(_) => Value::Null,
            }
        })
        .collect()
}
