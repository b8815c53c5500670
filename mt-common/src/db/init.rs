//! Database initialization
//!
//! Creates the SQLite file on first run and every table idempotently.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (safe to call repeatedly)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Repository tables
    create_experiments_table(pool).await?;
    create_datasets_table(pool).await?;
    create_dataset_files_table(pool).await?;
    create_schemas_table(pool).await?;
    create_parameter_names_table(pool).await?;
    create_parameter_sets_table(pool).await?;
    create_parameters_table(pool).await?;

    // Facility records (parties, activities)
    create_facility_tables(pool).await?;

    Ok(())
}

async fn create_experiments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS experiments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            institution_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_datasets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            experiment_id INTEGER NOT NULL REFERENCES experiments(id) ON DELETE CASCADE,
            description TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_dataset_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            url TEXT NOT NULL,
            size INTEGER,
            mimetype TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_schemas_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schemas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace TEXT NOT NULL,
            name TEXT NOT NULL,
            UNIQUE (namespace, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_schemas_name ON schemas(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_parameter_names_table(pool: &SqlitePool) -> Result<()> {
    // data_type: 'numeric' or 'string'
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parameter_names (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            schema_id INTEGER NOT NULL REFERENCES schemas(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            full_name TEXT NOT NULL,
            data_type TEXT NOT NULL,
            units TEXT,
            UNIQUE (schema_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parameter_sets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datafile_parameter_sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            schema_id INTEGER NOT NULL REFERENCES schemas(id) ON DELETE CASCADE,
            dataset_file_id INTEGER NOT NULL REFERENCES dataset_files(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_parameter_sets_file ON datafile_parameter_sets(dataset_file_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parameters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datafile_parameters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parameterset_id INTEGER NOT NULL REFERENCES datafile_parameter_sets(id) ON DELETE CASCADE,
            name_id INTEGER NOT NULL REFERENCES parameter_names(id) ON DELETE CASCADE,
            string_value TEXT,
            numerical_value REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Party/activity registry tables maintained by facility staff
async fn create_facility_tables(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS name_parts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL DEFAULT '',
            given TEXT NOT NULL DEFAULT '',
            family TEXT NOT NULL DEFAULT '',
            suffix TEXT NOT NULL DEFAULT ''
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS party_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT NOT NULL UNIQUE,
            type TEXT NOT NULL DEFAULT 'person',
            partyname_id INTEGER REFERENCES name_parts(id),
            birthdate TEXT,
            deathdate TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS party_locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            party_id INTEGER NOT NULL REFERENCES party_records(id) ON DELETE CASCADE,
            type TEXT NOT NULL DEFAULT 'url',
            value TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS party_descriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            party_id INTEGER NOT NULL REFERENCES party_records(id) ON DELETE CASCADE,
            type TEXT NOT NULL DEFAULT 'brief',
            value TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activity_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ident TEXT NOT NULL,
            key TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL DEFAULT 'project',
            subtype TEXT NOT NULL DEFAULT ''
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activity_party_relations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_id INTEGER NOT NULL REFERENCES activity_records(id) ON DELETE CASCADE,
            party_id INTEGER NOT NULL REFERENCES party_records(id) ON DELETE CASCADE,
            relation TEXT NOT NULL DEFAULT 'isManagedBy'
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activity_locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_id INTEGER NOT NULL REFERENCES activity_records(id) ON DELETE CASCADE,
            type TEXT NOT NULL DEFAULT 'url',
            value TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activity_descriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_id INTEGER NOT NULL REFERENCES activity_records(id) ON DELETE CASCADE,
            type TEXT NOT NULL DEFAULT 'brief',
            value TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS publish_authorisations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            auth_key TEXT NOT NULL,
            experiment_id INTEGER NOT NULL REFERENCES experiments(id) ON DELETE CASCADE,
            authoriser TEXT NOT NULL,
            email TEXT NOT NULL,
            status INTEGER NOT NULL DEFAULT 0,
            party_record_id INTEGER REFERENCES party_records(id),
            activity_record_id INTEGER REFERENCES activity_records(id),
            date_sent TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}
