//! Spectrum export formatting (CSV and JSON)

use crate::{Error, Result};
use serde::Serialize;

/// Download label derived from a datafile URL
///
/// Takes the URL basename, drops its final extension and replaces spaces
/// with underscores: `tardis://a/foo bar.spc` becomes `foo_bar`.
pub fn export_label(url: &str) -> String {
    let basename = url.rsplit('/').next().unwrap_or(url);
    let stem = match basename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => basename,
    };
    stem.replace(' ', "_")
}

/// Render channel counts as `index,value` rows with 1-based indices
pub fn to_csv(values: &[i32]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(values.len() * 8));

    for (index, value) in values.iter().enumerate() {
        writer.write_record(&[(index + 1).to_string(), value.to_string()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to flush CSV writer: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::Internal(e.to_string()))
}

/// JSON series body: `{"label": ..., "data": [[0, v0], [1, v1], ...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumSeries {
    pub label: String,
    pub data: Vec<(usize, i32)>,
}

impl SpectrumSeries {
    /// Pair each count with its 0-based channel index
    pub fn new(label: impl Into<String>, values: &[i32]) -> Self {
        Self {
            label: label.into(),
            data: values.iter().copied().enumerate().collect(),
        }
    }
}

/// Content-Disposition header value for a CSV download
pub fn csv_disposition(label: &str) -> String {
    format!("attachment; filename={}.csv", label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_rows() {
        let csv = to_csv(&[10, -5, 7]).unwrap();
        assert_eq!(csv, "1,10\n2,-5\n3,7\n");
    }

    #[test]
    fn test_csv_empty() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn test_json_series() {
        let series = SpectrumSeries::new(export_label("tardis://exp/foo bar.spc"), &[10, -5, 7]);
        let value = serde_json::to_value(&series).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"label": "foo_bar", "data": [[0, 10], [1, -5], [2, 7]]})
        );

        // label precedes data in the serialized body
        let text = serde_json::to_string(&series).unwrap();
        assert!(text.starts_with(r#"{"label":"foo_bar","data":"#));
    }

    #[test]
    fn test_export_label_variants() {
        assert_eq!(export_label("file://a/b/Sample 1 area 2.spc"), "Sample_1_area_2");
        assert_eq!(export_label("noext"), "noext");
        assert_eq!(export_label("file://dir/archive.tar.gz"), "archive.tar");
        assert_eq!(export_label("file://dir/.hidden"), ".hidden");
    }

    #[test]
    fn test_csv_disposition() {
        assert_eq!(csv_disposition("foo_bar"), "attachment; filename=foo_bar.csv");
    }
}
