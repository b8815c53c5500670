//! EDAX Genesis spectrum decoding
//!
//! A `.spc` file carries a fixed-size binary preamble followed by one
//! little-endian `i32` count per detector channel. Only the channel payload
//! is interpreted here.

use crate::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Size in bytes of one channel count
const CHANNEL_WIDTH: usize = 4;

/// Location and size of the channel payload within a spectrum file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrumLayout {
    /// Byte offset of the first channel
    pub offset: u64,
    /// Number of channels
    pub channels: usize,
}

impl SpectrumLayout {
    /// EDAX Genesis: 3840-byte preamble, 4000 channels
    pub const EDAX_GENESIS: SpectrumLayout = SpectrumLayout {
        offset: 3840,
        channels: 4000,
    };

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.channels * CHANNEL_WIDTH
    }

    /// Minimum file length holding the full payload
    pub fn min_file_len(&self) -> u64 {
        self.offset + self.payload_len() as u64
    }
}

impl Default for SpectrumLayout {
    fn default() -> Self {
        Self::EDAX_GENESIS
    }
}

/// Reads channel counts from spectrum files
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumReader {
    layout: SpectrumLayout,
}

impl SpectrumReader {
    pub fn new(layout: SpectrumLayout) -> Self {
        Self { layout }
    }

    /// Read every channel of the spectrum at `path`, in file order
    ///
    /// Fails without a partial result when the file is shorter than the
    /// layout requires.
    pub fn read(&self, path: &Path) -> Result<Vec<i32>> {
        let mut file = File::open(path)?;

        let actual = file.metadata()?.len();
        let expected = self.layout.min_file_len();
        if actual < expected {
            return Err(Error::TruncatedSpectrum {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        file.seek(SeekFrom::Start(self.layout.offset))?;
        let mut payload = vec![0u8; self.layout.payload_len()];
        file.read_exact(&mut payload)?;

        debug!(
            "Read {} spectrum channels from {}",
            self.layout.channels,
            path.display()
        );

        Ok(decode_channels(&payload))
    }
}

/// Decode a payload of little-endian `i32` counts
pub fn decode_channels(payload: &[u8]) -> Vec<i32> {
    payload
        .chunks_exact(CHANNEL_WIDTH)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Resolve the on-disk location of a stored datafile (spectrum or image)
///
/// Files live at `<file_store>/<experiment_id>/<dataset_id>/<relative path>`
/// where the relative path is the URL with its `protocol://` prefix removed.
pub fn datafile_path(
    file_store: &Path,
    experiment_id: i64,
    dataset_id: i64,
    url: &str,
) -> Result<PathBuf> {
    let relative = match url.split_once("//") {
        Some((_, rest)) => rest,
        None => url,
    };

    if relative.is_empty() {
        return Err(Error::InvalidInput(format!("Datafile URL has no path: {}", url)));
    }

    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::InvalidInput(format!(
            "Datafile URL escapes the file store: {}",
            url
        )));
    }

    Ok(file_store
        .join(experiment_id.to_string())
        .join(dataset_id.to_string())
        .join(relative))
}
