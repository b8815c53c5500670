//! EDAX Genesis spectrum summary

use super::FilterKind;
use crate::db::ExtractedParameter;
use crate::spectrum::SpectrumReader;
use crate::Result;
use std::path::Path;

pub const FILTER: FilterKind = FilterKind {
    name: "spc",
    extensions: &["spc"],
    extract,
};

pub fn extract(path: &Path) -> Result<Vec<ExtractedParameter>> {
    let counts = SpectrumReader::default().read(path)?;
    Ok(summarize(&counts))
}

/// Channel count, total counts and the highest channel (1-based)
pub fn summarize(counts: &[i32]) -> Vec<ExtractedParameter> {
    let total: i64 = counts.iter().map(|c| *c as i64).sum();

    let mut parameters = vec![
        ExtractedParameter::new("Channels", counts.len() as f64),
        ExtractedParameter::new("Total Counts", total as f64).with_units("counts"),
    ];

    // first channel wins on ties
    let peak = counts
        .iter()
        .enumerate()
        .fold(None::<(usize, i32)>, |best, (i, c)| match best {
            Some((_, b)) if b >= *c => best,
            _ => Some((i, *c)),
        });
    if let Some((index, value)) = peak {
        parameters.push(ExtractedParameter::new("Peak Channel", (index + 1) as f64));
        parameters.push(ExtractedParameter::new("Peak Counts", value as f64).with_units("counts"));
    }

    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ParameterValue;

    #[test]
    fn test_summary() {
        let params = summarize(&[3, 9, -1, 9]);
        let value = |name: &str| {
            params
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.value.clone())
                .unwrap()
        };
        assert_eq!(value("Channels"), ParameterValue::Numeric(4.0));
        assert_eq!(value("Total Counts"), ParameterValue::Numeric(20.0));
        assert_eq!(value("Peak Channel"), ParameterValue::Numeric(2.0));
        assert_eq!(value("Peak Counts"), ParameterValue::Numeric(9.0));
    }

    #[test]
    fn test_empty_has_no_peak() {
        let params = summarize(&[]);
        assert_eq!(params.len(), 2);
    }
}
