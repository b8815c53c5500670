//! Post-save metadata filters
//!
//! A filter is a pure extraction function bound to a schema. The registry
//! is built once from configuration; the ingestor runs every matching
//! filter against a stored datafile and records the results as parameter
//! sets. Image datafiles also get their thumbnails written.

pub mod exif;
pub mod spc;

use crate::config::FilterConfig;
use crate::db::{DatafileRepository, ExtractedParameter, SchemaRepository};
use crate::spectrum::datafile_path;
use crate::thumbnail::ThumbnailGenerator;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Extraction function signature
pub type ExtractFn = fn(&Path) -> Result<Vec<ExtractedParameter>>;

/// A built-in filter implementation
#[derive(Debug, Clone, Copy)]
pub struct FilterKind {
    /// Name used in configuration (`kind = "..."`)
    pub name: &'static str,
    /// Lower-case file extensions the filter understands
    pub extensions: &'static [&'static str],
    pub extract: ExtractFn,
}

/// All filter kinds known to the portal
pub const BUILTIN_FILTERS: [FilterKind; 2] = [exif::FILTER, spc::FILTER];

/// A filter kind bound to the schema its output is stored under
#[derive(Debug, Clone)]
pub struct RegisteredFilter {
    pub kind: FilterKind,
    pub schema_name: String,
    pub namespace: String,
}

impl RegisteredFilter {
    pub fn accepts(&self, path: &Path) -> bool {
        extension_of(path)
            .map(|ext| self.kind.extensions.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    pub fn extract(&self, path: &Path) -> Result<Vec<ExtractedParameter>> {
        (self.kind.extract)(path)
    }
}

/// Schema name -> extraction function map, resolved at startup
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<RegisteredFilter>,
}

impl FilterRegistry {
    /// Resolve configured filters against the built-in kinds
    pub fn from_config(configs: &[FilterConfig]) -> Result<Self> {
        let mut registry = Self::default();
        for config in configs {
            let kind = BUILTIN_FILTERS
                .iter()
                .find(|k| k.name == config.kind)
                .copied()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Unknown filter kind '{}' for schema {}",
                        config.kind, config.schema_name
                    ))
                })?;
            registry.register(kind, &config.schema_name, &config.namespace)?;
        }
        Ok(registry)
    }

    /// Register a filter; each schema may be bound only once
    pub fn register(&mut self, kind: FilterKind, schema_name: &str, namespace: &str) -> Result<()> {
        if self.for_schema(schema_name).is_some() {
            return Err(Error::Config(format!(
                "Schema {} already has a filter registered",
                schema_name
            )));
        }
        self.filters.push(RegisteredFilter {
            kind,
            schema_name: schema_name.to_string(),
            namespace: namespace.to_string(),
        });
        Ok(())
    }

    pub fn filters(&self) -> &[RegisteredFilter] {
        &self.filters
    }

    pub fn for_schema(&self, schema_name: &str) -> Option<&RegisteredFilter> {
        self.filters.iter().find(|f| f.schema_name == schema_name)
    }

    /// Filters that understand the file at `path`
    pub fn matching<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a RegisteredFilter> {
        self.filters.iter().filter(move |f| f.accepts(path))
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// True when the image crate can decode the file type
pub fn is_image(path: &Path) -> bool {
    image::ImageFormat::from_path(path).is_ok()
}

/// Summary of one stored parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedSet {
    pub schema_name: String,
    pub parameter_count: usize,
}

/// Result of ingesting one datafile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub datafile_id: i64,
    pub parameter_sets: Vec<IngestedSet>,
    pub thumbnails: bool,
}

/// Runs the filter registry over stored datafiles
#[derive(Debug, Clone)]
pub struct Ingestor<R> {
    repo: R,
    registry: Arc<FilterRegistry>,
    thumbnails: ThumbnailGenerator,
    file_store: PathBuf,
}

impl<R> Ingestor<R>
where
    R: SchemaRepository + DatafileRepository + Sync,
{
    pub fn new(
        repo: R,
        registry: Arc<FilterRegistry>,
        thumbnails: ThumbnailGenerator,
        file_store: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            registry,
            thumbnails,
            file_store: file_store.into(),
        }
    }

    /// Extract metadata from a stored datafile and write its thumbnails
    ///
    /// Every filter and the thumbnail writer run before anything is
    /// stored, so a failing file leaves its previous parameter sets intact.
    pub async fn ingest(&self, datafile_id: i64) -> Result<IngestReport> {
        let location = self.repo.datafile_location(datafile_id).await?;
        let path = datafile_path(
            &self.file_store,
            location.experiment_id,
            location.dataset_id,
            &location.url,
        )?;
        if !path.is_file() {
            return Err(Error::NotFound(format!("Stored file {}", path.display())));
        }

        let mut extracted = Vec::new();
        for filter in self.registry.matching(&path) {
            let task_filter = filter.clone();
            let source = path.clone();
            let parameters = tokio::task::spawn_blocking(move || task_filter.extract(&source))
                .await
                .map_err(|e| Error::Internal(format!("Filter task failed: {}", e)))??;

            if parameters.is_empty() {
                warn!(
                    "Filter {} found no metadata in {}",
                    filter.kind.name,
                    path.display()
                );
                continue;
            }
            extracted.push((filter, parameters));
        }

        let thumbnails = if is_image(&path) {
            let generator = self.thumbnails.clone();
            let source = path.clone();
            tokio::task::spawn_blocking(move || generator.generate_from_file(datafile_id, &source))
                .await
                .map_err(|e| Error::Internal(format!("Thumbnail task failed: {}", e)))??;
            true
        } else {
            false
        };

        let mut parameter_sets = Vec::with_capacity(extracted.len());
        for (filter, parameters) in extracted {
            let schema = self
                .repo
                .get_or_create_schema(&filter.namespace, &filter.schema_name)
                .await?;
            self.repo
                .save_parameter_set(datafile_id, &schema, &parameters)
                .await?;

            parameter_sets.push(IngestedSet {
                schema_name: schema.name,
                parameter_count: parameters.len(),
            });
        }

        info!(
            "Ingested datafile {}: {} parameter set(s), thumbnails={}",
            datafile_id,
            parameter_sets.len(),
            thumbnails
        );

        Ok(IngestReport {
            datafile_id,
            parameter_sets,
            thumbnails,
        })
    }
}
