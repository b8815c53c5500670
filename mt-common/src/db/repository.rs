//! Typed repository queries
//!
//! Handlers and the ingestor talk to storage through these traits;
//! `SqliteStore` is the production implementation.

use super::models::{
    DatafileLocation, DatasetFile, ExtractedParameter, Parameter, ParameterSet, ParameterValue,
    Schema,
};
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use tracing::debug;

/// Schema lookups
pub trait SchemaRepository {
    /// Schemas whose name equals `name` (any namespace)
    fn find_by_name(&self, name: &str) -> impl Future<Output = Result<Vec<Schema>>> + Send;

    /// Schemas whose name ends with `suffix` (case-sensitive)
    fn find_by_name_suffix(&self, suffix: &str)
        -> impl Future<Output = Result<Vec<Schema>>> + Send;

    /// Fetch the schema identified by namespace + name, creating it if missing
    fn get_or_create_schema(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Schema>> + Send;
}

/// Datafile and parameter-set queries
pub trait DatafileRepository {
    fn get_datafile(&self, id: i64) -> impl Future<Output = Result<Option<DatasetFile>>> + Send;

    /// Experiment/dataset ids and URL of a datafile; `NotFound` if absent
    fn datafile_location(&self, id: i64)
        -> impl Future<Output = Result<DatafileLocation>> + Send;

    /// All parameter sets of a datafile, parameters in storage order
    fn parameter_sets(
        &self,
        datafile_id: i64,
    ) -> impl Future<Output = Result<Vec<ParameterSet>>> + Send;

    /// Replace the datafile's parameter set for `schema`; returns the new set id
    fn save_parameter_set(
        &self,
        datafile_id: i64,
        schema: &Schema,
        parameters: &[ExtractedParameter],
    ) -> impl Future<Output = Result<i64>> + Send;
}

/// SQLite-backed repository
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_experiment(&self, title: &str, institution_name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO experiments (title, institution_name) VALUES (?, ?)")
            .bind(title)
            .bind(institution_name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn create_dataset(&self, experiment_id: i64, description: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO datasets (experiment_id, description) VALUES (?, ?)")
            .bind(experiment_id)
            .bind(description)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn create_datafile(
        &self,
        dataset_id: i64,
        filename: &str,
        url: &str,
        size: Option<i64>,
        mimetype: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO dataset_files (dataset_id, filename, url, size, mimetype) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(dataset_id)
        .bind(filename)
        .bind(url)
        .bind(size)
        .bind(mimetype)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

impl SchemaRepository for SqliteStore {
    async fn find_by_name(&self, name: &str) -> Result<Vec<Schema>> {
        let schemas = sqlx::query_as::<_, Schema>(
            "SELECT id, namespace, name FROM schemas WHERE name = ? ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(schemas)
    }

    async fn find_by_name_suffix(&self, suffix: &str) -> Result<Vec<Schema>> {
        if suffix.is_empty() {
            let schemas =
                sqlx::query_as::<_, Schema>("SELECT id, namespace, name FROM schemas ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?;
            return Ok(schemas);
        }

        // substr with a negative start counts from the right
        let schemas = sqlx::query_as::<_, Schema>(
            "SELECT id, namespace, name FROM schemas WHERE substr(name, ?) = ? ORDER BY id",
        )
        .bind(-(suffix.chars().count() as i64))
        .bind(suffix)
        .fetch_all(&self.pool)
        .await?;
        Ok(schemas)
    }

    async fn get_or_create_schema(&self, namespace: &str, name: &str) -> Result<Schema> {
        sqlx::query("INSERT OR IGNORE INTO schemas (namespace, name) VALUES (?, ?)")
            .bind(namespace)
            .bind(name)
            .execute(&self.pool)
            .await?;

        let schema = sqlx::query_as::<_, Schema>(
            "SELECT id, namespace, name FROM schemas WHERE namespace = ? AND name = ?",
        )
        .bind(namespace)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(schema)
    }
}

impl DatafileRepository for SqliteStore {
    async fn get_datafile(&self, id: i64) -> Result<Option<DatasetFile>> {
        let datafile = sqlx::query_as::<_, DatasetFile>(
            "SELECT id, dataset_id, filename, url, size, mimetype FROM dataset_files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(datafile)
    }

    async fn datafile_location(&self, id: i64) -> Result<DatafileLocation> {
        sqlx::query_as::<_, DatafileLocation>(
            "SELECT d.experiment_id, f.dataset_id, f.url
             FROM dataset_files f
             JOIN datasets d ON d.id = f.dataset_id
             WHERE f.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Datafile {}", id)))
    }

    async fn parameter_sets(&self, datafile_id: i64) -> Result<Vec<ParameterSet>> {
        let sets = sqlx::query_as::<_, (i64, i64, String, String)>(
            "SELECT ps.id, s.id, s.namespace, s.name
             FROM datafile_parameter_sets ps
             JOIN schemas s ON s.id = ps.schema_id
             WHERE ps.dataset_file_id = ?
             ORDER BY ps.id",
        )
        .bind(datafile_id)
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<
            _,
            (i64, String, String, Option<String>, Option<String>, Option<f64>),
        >(
            "SELECT p.parameterset_id, n.name, n.full_name, n.units, p.string_value, p.numerical_value
             FROM datafile_parameters p
             JOIN parameter_names n ON n.id = p.name_id
             JOIN datafile_parameter_sets ps ON ps.id = p.parameterset_id
             WHERE ps.dataset_file_id = ?
             ORDER BY p.id",
        )
        .bind(datafile_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_set: HashMap<i64, Vec<Parameter>> = HashMap::new();
        for (set_id, name, full_name, units, string_value, numerical_value) in rows {
            let value = match numerical_value {
                Some(v) => ParameterValue::Numeric(v),
                None => ParameterValue::String(string_value.unwrap_or_default()),
            };
            by_set.entry(set_id).or_default().push(Parameter {
                name,
                full_name,
                units,
                value,
            });
        }

        Ok(sets
            .into_iter()
            .map(|(id, schema_id, namespace, name)| ParameterSet {
                id,
                schema: Schema {
                    id: schema_id,
                    namespace,
                    name,
                },
                parameters: by_set.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    async fn save_parameter_set(
        &self,
        datafile_id: i64,
        schema: &Schema,
        parameters: &[ExtractedParameter],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM datafile_parameters WHERE parameterset_id IN
             (SELECT id FROM datafile_parameter_sets WHERE dataset_file_id = ? AND schema_id = ?)",
        )
        .bind(datafile_id)
        .bind(schema.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM datafile_parameter_sets WHERE dataset_file_id = ? AND schema_id = ?")
            .bind(datafile_id)
            .bind(schema.id)
            .execute(&mut *tx)
            .await?;

        let set_id = sqlx::query(
            "INSERT INTO datafile_parameter_sets (schema_id, dataset_file_id) VALUES (?, ?)",
        )
        .bind(schema.id)
        .bind(datafile_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for parameter in parameters {
            sqlx::query(
                "INSERT OR IGNORE INTO parameter_names (schema_id, name, full_name, data_type, units)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(schema.id)
            .bind(&parameter.name)
            .bind(&parameter.name)
            .bind(parameter.value.data_type())
            .bind(&parameter.units)
            .execute(&mut *tx)
            .await?;

            let name_id: i64 = sqlx::query_scalar(
                "SELECT id FROM parameter_names WHERE schema_id = ? AND name = ?",
            )
            .bind(schema.id)
            .bind(&parameter.name)
            .fetch_one(&mut *tx)
            .await?;

            let (string_value, numerical_value) = match &parameter.value {
                ParameterValue::Numeric(v) => (None, Some(*v)),
                ParameterValue::String(s) => (Some(s.as_str()), None),
            };

            sqlx::query(
                "INSERT INTO datafile_parameters (parameterset_id, name_id, string_value, numerical_value)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(set_id)
            .bind(name_id)
            .bind(string_value)
            .bind(numerical_value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            "Stored {} parameters for datafile {} under schema {}",
            parameters.len(),
            datafile_id,
            schema.name
        );
        Ok(set_id)
    }
}
