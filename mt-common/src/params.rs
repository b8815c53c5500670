//! Display ordering of datafile parameters
//!
//! Parameter sets come back from storage in insertion order. For the two
//! schema families the facility cares about, the metadata panel shows a few
//! well-known fields first:
//!
//! - spectrum: acquisition fields, then peak elements by peak number, then
//!   everything else alphabetically
//! - EXIF: acquisition date and time, then everything else alphabetically
//!
//! Parameter sets of any other schema keep their storage order.

use crate::db::{ParameterSet, SchemaRepository};
use crate::Result;
use std::collections::{BTreeMap, HashSet};

/// Leading fields of spectrum parameter sets
pub const SPECTRUM_FIELD_ORDER: [&str; 4] =
    ["Sample Type (Label)", "Preset", "Live Time", "Acc. Voltage"];

/// Prefix of per-peak element fields, e.g. `Peak ID Element 12`
pub const PEAK_ELEMENT_PREFIX: &str = "Peak ID Element";

/// Leading fields of EXIF parameter sets
pub const EXIF_FIELD_ORDER: [&str; 2] = ["[User] Date", "[User] Time"];

/// Ordering family of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFamily {
    Spectrum,
    Exif,
    Default,
}

/// Maps schema ids to their ordering family
#[derive(Debug, Clone, Default)]
pub struct SchemaClassifier {
    spectrum_ids: HashSet<i64>,
    exif_ids: HashSet<i64>,
}

impl SchemaClassifier {
    pub fn new(
        spectrum_ids: impl IntoIterator<Item = i64>,
        exif_ids: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            spectrum_ids: spectrum_ids.into_iter().collect(),
            exif_ids: exif_ids.into_iter().collect(),
        }
    }

    /// Look up the spectrum schemas (exact name) and EXIF schemas (name suffix)
    pub async fn resolve<R: SchemaRepository>(
        repo: &R,
        spectrum_schema_name: &str,
        exif_schema_suffix: &str,
    ) -> Result<Self> {
        let spectrum = repo.find_by_name(spectrum_schema_name).await?;
        let exif = repo.find_by_name_suffix(exif_schema_suffix).await?;
        Ok(Self::new(
            spectrum.into_iter().map(|s| s.id),
            exif.into_iter().map(|s| s.id),
        ))
    }

    /// Spectrum membership wins if a schema matches both families
    pub fn family(&self, schema_id: i64) -> SchemaFamily {
        if self.spectrum_ids.contains(&schema_id) {
            SchemaFamily::Spectrum
        } else if self.exif_ids.contains(&schema_id) {
            SchemaFamily::Exif
        } else {
            SchemaFamily::Default
        }
    }

    /// Reorder the parameters of every set according to its family
    pub fn sort_sets(&self, sets: Vec<ParameterSet>) -> Vec<ParameterSet> {
        sets.into_iter()
            .map(|mut set| {
                let family = self.family(set.schema.id);
                set.parameters = sort_parameters(family, set.parameters, |p| p.full_name.as_str());
                set
            })
            .collect()
    }
}

/// Order `items` for display; `key` yields the parameter name
///
/// For the spectrum and EXIF families names are treated as map keys: when a
/// name repeats, the last item wins.
pub fn sort_parameters<T, F>(family: SchemaFamily, items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let leading: &[&str] = match family {
        SchemaFamily::Spectrum => &SPECTRUM_FIELD_ORDER,
        SchemaFamily::Exif => &EXIF_FIELD_ORDER,
        SchemaFamily::Default => return items,
    };

    let mut unsorted: BTreeMap<String, T> = BTreeMap::new();
    for item in items {
        unsorted.insert(key(&item).to_string(), item);
    }

    let mut sorted = Vec::with_capacity(unsorted.len());
    for field in leading {
        if let Some(item) = unsorted.remove(*field) {
            sorted.push(item);
        }
    }

    if family == SchemaFamily::Spectrum {
        let mut peaks: Vec<(i64, String)> = unsorted
            .keys()
            .filter(|k| k.starts_with(PEAK_ELEMENT_PREFIX))
            .filter_map(|k| peak_number(k).map(|n| (n, k.clone())))
            .collect();
        peaks.sort_by_key(|(n, _)| *n);

        for (_, field) in peaks {
            if let Some(item) = unsorted.remove(&field) {
                sorted.push(item);
            }
        }
    }

    // BTreeMap iteration is lexicographic by key
    sorted.extend(unsorted.into_values());
    sorted
}

/// Trailing integer of a peak field name
fn peak_number(field: &str) -> Option<i64> {
    field.split(' ').last().and_then(|n| n.parse().ok())
}
