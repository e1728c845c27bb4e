//! Artifact naming and JSON rendering

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::PathBuf;

/// Filename prefix shared by every artifact
pub const ARTIFACT_PREFIX: &str = "response_";

/// Timestamp layout embedded in artifact filenames
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A persisted snapshot on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Full path of the written file
    pub path: PathBuf,

    /// Bare filename, e.g. `response_2024-05-01_20-00-00.json`
    pub file_name: String,

    /// Local wall-clock instant the payload was captured
    pub captured_at: NaiveDateTime,

    /// Number of bytes written
    pub size: usize,
}

impl Artifact {
    /// Reads the artifact back from disk
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Derives the artifact filename from the capture instant
///
/// Second granularity; two captures in the same second share a name.
pub fn artifact_file_name(captured_at: &NaiveDateTime) -> String {
    format!(
        "{}{}.json",
        ARTIFACT_PREFIX,
        captured_at.format(ARTIFACT_TIMESTAMP_FORMAT)
    )
}

/// Renders a payload as 4-space indented JSON with non-ASCII kept verbatim
pub fn render_payload<T>(payload: &T) -> Result<Vec<u8>, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    payload.serialize(&mut serializer)?;
    Ok(buf)
}
