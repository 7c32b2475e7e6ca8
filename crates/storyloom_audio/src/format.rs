//! WAV header inspection.

use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

/// Sample layout of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct AudioFormat {
    /// Interleaved channels
    channels: u16,
    /// Frames per second
    sample_rate: u32,
    /// Bits per sample
    bits_per_sample: u16,
    /// Samples are IEEE floats rather than integers
    float: bool,
}

impl From<hound::WavSpec> for AudioFormat {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            float: spec.sample_format == hound::SampleFormat::Float,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}ch {}Hz {}-bit {}",
            self.channels,
            self.sample_rate,
            self.bits_per_sample,
            if self.float { "float" } else { "int" }
        )
    }
}

/// What is known about a WAV file on disk.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct WavInfo {
    /// The file exists
    exists: bool,
    /// File size, zero when missing
    byte_size: u64,
    /// Length in seconds when the header parses
    duration_secs: Option<f64>,
    /// Sample layout when the header parses
    format: Option<AudioFormat>,
}

/// Duration in seconds of an in-memory WAV, or `None` if it does not parse.
///
/// Duration is sample data bytes divided by `rate * channels * bytes_per_sample`.
pub fn wav_duration(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Inspect a WAV file without loading its samples.
pub fn inspect(path: &Path) -> WavInfo {
    let Ok(metadata) = std::fs::metadata(path) else {
        return WavInfo {
            exists: false,
            byte_size: 0,
            duration_secs: None,
            format: None,
        };
    };

    let header = hound::WavReader::open(path).ok().map(|reader| {
        let spec = reader.spec();
        let duration = (spec.sample_rate > 0)
            .then(|| reader.duration() as f64 / spec.sample_rate as f64);
        (duration, AudioFormat::from(spec))
    });

    WavInfo {
        exists: true,
        byte_size: metadata.len(),
        duration_secs: header.and_then(|(d, _)| d),
        format: header.map(|(_, f)| f),
    }
}
