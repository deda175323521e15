//! `version.json` decoding.
//!
//! Only the top-level `"version"` string matters; every other property is
//! ignored.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde_json::Value;

use crate::HeightError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Extract the `"version"` property from JSON text.
///
/// Returns `None` when the document is not an object or the property is
/// missing or not a string.
pub fn parse_version(data: &[u8]) -> Result<Option<String>, HeightError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let doc: Value = serde_json::from_slice(data)?;
    Ok(doc
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_owned))
}

pub fn read_version<R: Read>(mut reader: R) -> Result<Option<String>, HeightError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse_version(&data)
}

/// Read a version file from disk; a missing file is
/// [`HeightError::MissingVersionFile`].
pub fn read_version_file(path: &Path) -> Result<Option<String>, HeightError> {
    match fs::read(path) {
        Ok(data) => parse_version(&data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(HeightError::MissingVersionFile(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_top_level_version() {
        let json = br#"{ "$schema": "x", "version": "1.2-beta", "publicReleaseRefSpec": [] }"#;
        assert_eq!(parse_version(json).unwrap().as_deref(), Some("1.2-beta"));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let mut json = UTF8_BOM.to_vec();
        json.extend_from_slice(br#"{"version":"3.0"}"#);
        assert_eq!(parse_version(&json).unwrap().as_deref(), Some("3.0"));
    }

    #[test]
    fn nested_or_non_string_versions_do_not_count() {
        assert_eq!(parse_version(br#"{"inner":{"version":"1.0"}}"#).unwrap(), None);
        assert_eq!(parse_version(br#"{"version":1}"#).unwrap(), None);
        assert_eq!(parse_version(br#"["version"]"#).unwrap(), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_version(b"{\"version\":"), Err(HeightError::Json(_))));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.json");
        assert!(matches!(
            read_version_file(&path),
            Err(HeightError::MissingVersionFile(p)) if p == path
        ));
    }
}
