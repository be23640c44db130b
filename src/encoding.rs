//! Strict decoding and deterministic encoding
//!
//! Every configuration file is decoded in two passes: a lenient pass that
//! only reads the `version` key, then a strict pass into the wire struct for
//! that version, which rejects unknown fields. YAML is the primary format;
//! JSON is accepted where the caller allows it.

use crate::error::{Error, Result};
use crate::file_version::FileVersion;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct VersionOnly {
    #[serde(default)]
    version: Option<serde_yaml::Value>,
}

/// Read only the `version` key of a document.
pub fn read_version(file_name: &str, data: &[u8], allow_json: bool) -> Result<Option<String>> {
    let peeked: VersionOnly = decode(file_name, None, data, allow_json)?;
    match peeked.version {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Error::Decode {
            file_name: file_name.to_string(),
            file_version: None,
            message: format!("version must be a string, got {:?}", other),
        }),
    }
}

/// Decode a document into a wire struct. Unknown fields are rejected by the
/// wire structs themselves.
pub fn decode<T: DeserializeOwned>(
    file_name: &str,
    file_version: Option<FileVersion>,
    data: &[u8],
    allow_json: bool,
) -> Result<T> {
    let to_error = |message: String| Error::Decode {
        file_name: file_name.to_string(),
        file_version,
        message,
    };
    if is_blank(data) {
        return serde_yaml::from_str("{}").map_err(|e| to_error(e.to_string()));
    }
    if allow_json && looks_like_json(data) {
        return serde_json::from_slice(data).map_err(|e| to_error(e.to_string()));
    }
    serde_yaml::from_slice(data).map_err(|e| to_error(e.to_string()))
}

/// Encode a wire struct as YAML.
pub fn encode_yaml<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_yaml::to_string(value)?.into_bytes())
}

/// Encode a wire struct as pretty-printed JSON with a trailing newline.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    Ok(data)
}

fn is_blank(data: &[u8]) -> bool {
    String::from_utf8_lossy(data)
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}

fn looks_like_json(data: &[u8]) -> bool {
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}
