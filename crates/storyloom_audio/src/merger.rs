//! WAV concatenation.

use crate::AudioFormat;
use chrono::Utc;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use storyloom_core::ItemId;
use storyloom_error::{MergeError, MergeErrorKind};
use tracing::{debug, info, instrument, warn};

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct MergeSummary {
    /// Merged file
    output: PathBuf,
    /// Sum of input durations in seconds
    total_duration_secs: f64,
    /// Size of the merged file
    byte_size: u64,
    /// Number of inputs merged
    segment_count: usize,
}

fn wav_error(path: &Path, e: hound::Error) -> MergeError {
    match e {
        hound::Error::IoError(io) => {
            MergeError::new(MergeErrorKind::Io(format!("{}: {}", path.display(), io)))
        }
        other => MergeError::new(MergeErrorKind::Wav(format!("{}: {}", path.display(), other))),
    }
}

fn io_error(path: &Path, e: std::io::Error) -> MergeError {
    MergeError::new(MergeErrorKind::Io(format!("{}: {}", path.display(), e)))
}

type WavFileReader = hound::WavReader<BufReader<File>>;
type WavFileWriter = hound::WavWriter<BufWriter<File>>;

/// Concatenates narration segments into one WAV track.
///
/// Merged tracks for an item live under `{output_dir}/{item_id}/merged/`.
#[derive(Debug, Clone)]
pub struct AudioMerger {
    output_dir: PathBuf,
}

impl AudioMerger {
    /// Create a merger writing under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory holding an item's merged tracks.
    pub fn item_dir(&self, item_id: ItemId) -> PathBuf {
        self.output_dir.join(item_id.to_string()).join("merged")
    }

    /// Merge an item's segments into a freshly named file in its directory.
    ///
    /// # Errors
    ///
    /// See [`AudioMerger::merge`].
    pub fn merge_item(
        &self,
        item_id: ItemId,
        inputs: &[PathBuf],
    ) -> Result<MergeSummary, MergeError> {
        let file_name = format!(
            "story_{}_complete_{}.wav",
            item_id,
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        self.merge(inputs, &self.item_dir(item_id).join(file_name))
    }

    /// Concatenate `inputs` in order into `output`.
    ///
    /// The first input fixes the output format. Sample data of every input is
    /// streamed into the output; headers are rewritten once at the end. The
    /// output is written to a temp file and renamed into place, so a failed
    /// merge leaves nothing at `output`.
    ///
    /// # Errors
    ///
    /// - `NoSegments` when `inputs` is empty
    /// - `MissingFile` when an input does not exist
    /// - `FormatMismatch` when an input's format differs from the first
    /// - `Wav` / `Io` on decode, encode or filesystem failures
    #[instrument(skip(self, inputs), fields(count = inputs.len(), output = %output.display()))]
    pub fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<MergeSummary, MergeError> {
        let Some(first) = inputs.first() else {
            return Err(MergeError::new(MergeErrorKind::NoSegments));
        };

        if let Some(missing) = inputs.iter().find(|p| !p.is_file()) {
            return Err(MergeError::new(MergeErrorKind::MissingFile(
                missing.display().to_string(),
            )));
        }

        let spec = hound::WavReader::open(first)
            .map_err(|e| wav_error(first, e))?
            .spec();
        debug!(format = %AudioFormat::from(spec), "Output format fixed by first segment");

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let temp_path = output.with_extension("wav.tmp");
        let total_duration_secs = match Self::write_concatenated(inputs, spec, &temp_path) {
            Ok(total) => total,
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_file(&temp_path) {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            path = %temp_path.display(),
                            error = %cleanup,
                            "Failed to remove partial merge"
                        );
                    }
                }
                return Err(e);
            }
        };

        std::fs::rename(&temp_path, output).map_err(|e| io_error(output, e))?;
        let byte_size = std::fs::metadata(output)
            .map_err(|e| io_error(output, e))?
            .len();

        info!(
            segments = inputs.len(),
            total_duration_secs,
            byte_size,
            "Audio merge completed"
        );

        Ok(MergeSummary {
            output: output.to_path_buf(),
            total_duration_secs,
            byte_size,
            segment_count: inputs.len(),
        })
    }

    fn write_concatenated(
        inputs: &[PathBuf],
        spec: hound::WavSpec,
        temp_path: &Path,
    ) -> Result<f64, MergeError> {
        let mut writer = hound::WavWriter::create(temp_path, spec)
            .map_err(|e| wav_error(temp_path, e))?;
        let expected = AudioFormat::from(spec);
        let mut total = 0.0;

        for path in inputs {
            let mut reader = hound::WavReader::open(path).map_err(|e| wav_error(path, e))?;
            let found = AudioFormat::from(reader.spec());
            if found != expected {
                return Err(MergeError::new(MergeErrorKind::FormatMismatch {
                    path: path.display().to_string(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                }));
            }

            let duration = reader.duration() as f64 / spec.sample_rate as f64;
            Self::copy_samples(&mut reader, &mut writer, spec, path)?;
            debug!(path = %path.display(), duration, "Segment appended");
            total += duration;
        }

        writer.finalize().map_err(|e| wav_error(temp_path, e))?;
        Ok(total)
    }

    fn copy_samples(
        reader: &mut WavFileReader,
        writer: &mut WavFileWriter,
        spec: hound::WavSpec,
        path: &Path,
    ) -> Result<(), MergeError> {
        match spec.sample_format {
            hound::SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    let sample = sample.map_err(|e| wav_error(path, e))?;
                    writer.write_sample(sample).map_err(|e| wav_error(path, e))?;
                }
            }
            hound::SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    let sample = sample.map_err(|e| wav_error(path, e))?;
                    writer.write_sample(sample).map_err(|e| wav_error(path, e))?;
                }
            }
        }
        Ok(())
    }

    /// Remove an item's merged tracks last modified at least `max_age` ago.
    ///
    /// Returns the number of files removed. A missing directory removes nothing.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be listed or a file cannot be removed.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub fn cleanup_older_than(
        &self,
        item_id: ItemId,
        max_age: Duration,
    ) -> Result<usize, MergeError> {
        let dir = self.item_dir(item_id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&dir, e))?;
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age >= max_age {
                std::fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
                debug!(path = %path.display(), "Removed stale merged file");
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Cleaned up merged files");
        }
        Ok(removed)
    }
}
