//! The persisted result of a mapping run.
//!
//! On disk a record is a 4-byte little-endian header length, the bincode
//! encoded [`FileHeader`] (magic, format version, [`RecordHeader`]), then the
//! bincode encoded [`RecordPayload`].

use crate::engine::{Engine, RunOutcome};
use crate::individual::Individual;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Magic bytes identifying a Tessera mapping record.
const RECORD_MAGIC: [u8; 4] = *b"TSRA";

/// Current record format version.
const RECORD_FORMAT_VERSION: u32 = 1;

/// Errors reading or writing a record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// bincode encoding failed.
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// bincode decoding failed or the file is truncated.
    #[error("failed to decode record: {0}")]
    Decode(String),

    /// The file is not a mapping record.
    #[error("not a mapping record (bad magic)")]
    BadMagic,

    /// The record was written by an incompatible format version.
    #[error("record format version {actual} is not supported (expected {expected})")]
    VersionMismatch {
        /// The version this build reads.
        expected: u32,
        /// The version found in the file.
        actual: u32,
    },

    /// JSON conversion failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Describes how a record was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Architecture model name.
    pub architecture: String,
    /// Application name.
    pub application: String,
    /// Simulation parameters the objectives saw.
    pub sim: BTreeMap<String, f64>,
    /// Objective names in fitness order.
    pub objectives: Vec<String>,
    /// Fitness weights: `-1.0` minimise, `1.0` maximise.
    pub weights: Vec<f64>,
}

/// The search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Valid Pareto-archive members.
    pub archive: Vec<Individual>,
    /// Archive fitness set per generation.
    pub fitness_log: Vec<Vec<Vec<f64>>>,
}

/// Header plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Run description.
    pub header: RecordHeader,
    /// Run result.
    pub payload: RecordPayload,
}

#[derive(Serialize, Deserialize)]
struct FileHeader {
    magic: [u8; 4],
    format_version: u32,
    header: RecordHeader,
}

impl MappingRecord {
    /// Builds a record from a finished run.
    pub fn from_run(engine: &Engine, outcome: RunOutcome) -> Self {
        Self {
            header: RecordHeader {
                architecture: engine.arch().name().to_string(),
                application: engine.app().name().to_string(),
                sim: engine.sim().clone(),
                objectives: engine.objective_names(),
                weights: engine.fitness_weights(),
            },
            payload: RecordPayload {
                archive: outcome.archive,
                fitness_log: outcome.fitness_log,
            },
        }
    }

    /// Encodes the record in its binary file layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let file_header = FileHeader {
            magic: RECORD_MAGIC,
            format_version: RECORD_FORMAT_VERSION,
            header: self.header.clone(),
        };
        let config = bincode::config::standard();
        let header_bytes = bincode::serde::encode_to_vec(&file_header, config)
            .map_err(|e| RecordError::Encode(e.to_string()))?;
        let payload_bytes = bincode::serde::encode_to_vec(&self.payload, config)
            .map_err(|e| RecordError::Encode(e.to_string()))?;

        let header_len = header_bytes.len() as u32;
        let mut out = Vec::with_capacity(4 + header_bytes.len() + payload_bytes.len());
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&payload_bytes);
        Ok(out)
    }

    /// Decodes a record, validating magic and format version first.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, RecordError> {
        let header = Self::header_from_bytes(raw)?;
        let header_len = header_len(raw)?;
        let (payload, _): (RecordPayload, usize) =
            bincode::serde::decode_from_slice(&raw[4 + header_len..], bincode::config::standard())
                .map_err(|e| RecordError::Decode(e.to_string()))?;
        Ok(Self { header, payload })
    }

    /// Decodes only the header; the payload is not touched.
    pub fn header_from_bytes(raw: &[u8]) -> Result<RecordHeader, RecordError> {
        let len = header_len(raw)?;
        let (file_header, _): (FileHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..4 + len], bincode::config::standard())
                .map_err(|e| RecordError::Decode(e.to_string()))?;
        if file_header.magic != RECORD_MAGIC {
            return Err(RecordError::BadMagic);
        }
        if file_header.format_version != RECORD_FORMAT_VERSION {
            return Err(RecordError::VersionMismatch {
                expected: RECORD_FORMAT_VERSION,
                actual: file_header.format_version,
            });
        }
        Ok(file_header.header)
    }

    /// Pretty JSON for human inspection.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses the JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn header_len(raw: &[u8]) -> Result<usize, RecordError> {
    let prefix: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| RecordError::Decode("truncated length prefix".to_string()))?;
    let len = u32::from_le_bytes(prefix) as usize;
    if raw.len() < 4 + len {
        return Err(RecordError::Decode("truncated header".to_string()));
    }
    Ok(len)
}

/// Writes `record` to `path`.
pub fn write_record(path: &Path, record: &MappingRecord) -> Result<(), RecordError> {
    let bytes = record.to_bytes()?;
    std::fs::write(path, bytes).map_err(|e| RecordError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reads a record from `path`.
pub fn read_record(path: &Path) -> Result<MappingRecord, RecordError> {
    let raw = std::fs::read(path).map_err(|e| RecordError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    MappingRecord::from_bytes(&raw)
}
