//! Microscope image metadata
//!
//! SEM/FIB instruments write their acquisition settings into the image file
//! as an INI-style text block:
//!
//! ```text
//! [User]
//! Date=03/14/2012
//! Time=10:22:41 AM
//! [Beam]
//! HV=20000
//! ```
//!
//! Each `key=value` line becomes a parameter named `[Section] key`.

use super::FilterKind;
use crate::db::{ExtractedParameter, ParameterValue};
use crate::Result;
use std::path::Path;

pub const FILTER: FilterKind = FilterKind {
    name: "exif",
    extensions: &["tif", "tiff", "jpg", "jpeg", "png"],
    extract,
};

/// Section that opens the metadata block
const BLOCK_MARKER: &[u8] = b"[User]";

/// Read the file and extract its metadata block, if any
pub fn extract(path: &Path) -> Result<Vec<ExtractedParameter>> {
    let bytes = std::fs::read(path)?;
    Ok(parse_block(&bytes))
}

/// Locate the text block in raw file bytes and parse it
pub fn parse_block(bytes: &[u8]) -> Vec<ExtractedParameter> {
    let Some(start) = find(bytes, BLOCK_MARKER) else {
        return Vec::new();
    };

    let block = &bytes[start..];
    let end = block.iter().position(|b| *b == 0).unwrap_or(block.len());
    parse_ini(&String::from_utf8_lossy(&block[..end]))
}

/// Parse INI text into `[Section] key` parameters
pub fn parse_ini(text: &str) -> Vec<ExtractedParameter> {
    let mut section: Option<&str> = None;
    let mut parameters = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = Some(&line[1..line.len() - 1]);
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let name = match section {
            Some(section) => format!("[{}] {}", section, key),
            None => key.to_string(),
        };
        parameters.push(ExtractedParameter::new(name, parse_value(value.trim())));
    }

    parameters
}

fn parse_value(value: &str) -> ParameterValue {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => ParameterValue::Numeric(number),
        _ => ParameterValue::String(value.to_string()),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ini_sections() {
        let params = parse_ini("[User]\r\nDate=03/14/2012\r\nTime=10:22 AM\r\n[Beam]\r\nHV=20000\r\nSpot=\r\n");
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["[User] Date", "[User] Time", "[Beam] HV", "[Beam] Spot"]);
        assert_eq!(params[2].value, ParameterValue::Numeric(20000.0));
        assert_eq!(params[0].value, ParameterValue::from("03/14/2012"));
        assert_eq!(params[3].value, ParameterValue::from(""));
    }

    #[test]
    fn test_block_found_inside_binary() {
        let mut bytes = vec![0x49, 0x49, 0x2A, 0x00, 0xFF, 0x10];
        bytes.extend_from_slice(b"[User]\nDate=01/02/2013\n[Stage]\nX=0.0012\n");
        bytes.push(0);
        bytes.extend_from_slice(b"Garbage=ignored");

        let params = parse_block(&bytes);
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].name, "[Stage] X");
        assert_eq!(params[1].value, ParameterValue::Numeric(0.0012));
    }

    #[test]
    fn test_no_block() {
        assert!(parse_block(b"plain image bytes").is_empty());
    }

    #[test]
    fn test_nan_stays_text() {
        let params = parse_ini("[User]\nValue=NaN\n");
        assert_eq!(params[0].value, ParameterValue::from("NaN"));
    }
}
