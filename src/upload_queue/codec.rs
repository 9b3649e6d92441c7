//! Versioned serialization of upload records for the database blob column.
//!
//! Records are stored as JSON with an explicit `schema_version` tag so that a
//! newer app can read blobs written by an older one. Unknown fields are
//! ignored and fields added later fall back to their defaults, which keeps
//! decoding both backward and forward tolerant within the supported version.

use super::models::UploadRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest blob schema version this build can decode.
pub const CODEC_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record blob is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("record blob schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Serialize, Deserialize)]
struct VersionedBlob {
    schema_version: u32,
    #[serde(flatten)]
    record: UploadRecord,
}

// Only the version tag, so we can reject too-new blobs before trying to
// deserialize a record shape we do not know.
#[derive(Deserialize)]
struct VersionProbe {
    schema_version: u32,
}

/// Encode a record into its durable blob form.
pub fn encode(record: &UploadRecord) -> Result<String, CodecError> {
    let blob = VersionedBlob {
        schema_version: CODEC_VERSION,
        record: record.clone(),
    };
    Ok(serde_json::to_string(&blob)?)
}

/// Decode a durable blob back into a record.
pub fn decode(blob: &str) -> Result<UploadRecord, CodecError> {
    let probe: VersionProbe = serde_json::from_str(blob)?;
    if probe.schema_version > CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: probe.schema_version,
            supported: CODEC_VERSION,
        });
    }
    let versioned: VersionedBlob = serde_json::from_str(blob)?;
    Ok(versioned.record)
}
