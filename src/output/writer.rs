//! JSON persistence of analysis results
//!
//! The artifact is wrapped in an envelope that names the producer:
//!
//! ```json
//! {"fileHash": "linear_analysis_v0.1.0", "linear_analysis": { ... }}
//! ```
//!
//! Files are written to a temporary file first and then moved into place, so a
//! reader never sees a half-written artifact.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::result::AnalysisResult;
use crate::error::AnalysisError;

/// Producer tag stored in the envelope's `fileHash` field
pub fn producer_tag() -> String {
    format!("linear_analysis_v{}", env!("CARGO_PKG_VERSION"))
}

/// On-disk layout of a result file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Producer tag, see [`producer_tag`]
    #[serde(rename = "fileHash")]
    pub file_hash: String,
    /// The analysis itself
    pub linear_analysis: AnalysisResult,
}

impl ResultEnvelope {
    /// Wrap a result with the current producer tag
    pub fn new(result: AnalysisResult) -> Self {
        Self {
            file_hash: producer_tag(),
            linear_analysis: result,
        }
    }
}

/// Destination for finished results
pub trait ResultWriter {
    /// Persist `result` and return where it went
    ///
    /// # Errors
    ///
    /// `AnalysisError::Io` if the artifact cannot be written
    fn write(&self, result: &AnalysisResult) -> Result<PathBuf, AnalysisError>;
}

/// Writes the JSON envelope to a file
#[derive(Debug, Clone, Default)]
pub struct JsonFileWriter {
    path: Option<PathBuf>,
    pretty: bool,
}

impl JsonFileWriter {
    /// Write to a fresh file in the system temp directory
    pub fn temporary() -> Self {
        Self::default()
    }

    /// Write to `path`, replacing any existing file
    pub fn to_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            pretty: false,
        }
    }

    /// Indent the JSON output
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn serialize_into<W: Write>(&self, writer: W, result: &AnalysisResult) -> Result<(), AnalysisError> {
        let envelope = EnvelopeRef {
            file_hash: producer_tag(),
            linear_analysis: result,
        };
        let mut writer = BufWriter::new(writer);
        let serialized = if self.pretty {
            serde_json::to_writer_pretty(&mut writer, &envelope)
        } else {
            serde_json::to_writer(&mut writer, &envelope)
        };
        serialized.map_err(|e| AnalysisError::Io(format!("Failed to serialize result: {}", e)))?;
        writer
            .flush()
            .map_err(|e| AnalysisError::Io(format!("Failed to write result: {}", e)))
    }
}

impl ResultWriter for JsonFileWriter {
    fn write(&self, result: &AnalysisResult) -> Result<PathBuf, AnalysisError> {
        match &self.path {
            Some(path) => {
                let dir = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| {
                    AnalysisError::Io(format!("Failed to create file in {}: {}", dir.display(), e))
                })?;
                self.serialize_into(file.as_file_mut(), result)?;
                file.persist(path).map_err(|e| {
                    AnalysisError::Io(format!("Failed to persist {}: {}", path.display(), e))
                })?;
                log::debug!("Result written to {}", path.display());
                Ok(path.clone())
            }
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("linear_analysis_")
                    .suffix(".json")
                    .tempfile()
                    .map_err(|e| AnalysisError::Io(format!("Failed to create temp file: {}", e)))?;
                self.serialize_into(file.as_file_mut(), result)?;
                let (_, path) = file
                    .keep()
                    .map_err(|e| AnalysisError::Io(format!("Failed to keep temp file: {}", e)))?;
                log::debug!("Result written to {}", path.display());
                Ok(path)
            }
        }
    }
}

/// Read a result file written by [`JsonFileWriter`]
///
/// # Errors
///
/// `AnalysisError::Io` if the file cannot be read or is not a result envelope
pub fn read_result(path: &Path) -> Result<ResultEnvelope, AnalysisError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AnalysisError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AnalysisError::Io(format!("Failed to parse {}: {}", path.display(), e)))
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    #[serde(rename = "fileHash")]
    file_hash: String,
    linear_analysis: &'a AnalysisResult,
}
