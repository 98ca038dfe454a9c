//! Data files written into the checkout.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::error::{Result, ScmError};
use crate::TIMESTAMP_FORMAT;

/// A flat mapping of field names to values, serialized with sorted keys.
pub type Record = BTreeMap<String, serde_yaml::Value>;

/// Payload of [`crate::Session::write_file`].
#[derive(Debug, Clone, PartialEq)]
pub enum FileData {
    /// Structured data, dumped as a YAML document.
    Record(Record),
    /// Written verbatim.
    Text(String),
}

impl From<Record> for FileData {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<String> for FileData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FileData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Insert `-YYYYMMDD-HHMMSS` before the file extension.
    pub append_timestamp: bool,
    /// Dump a [`FileData::Record`] as YAML instead of writing raw text.
    pub serialize_as_structured: bool,
}

/// `data.yaml` → `data-20240101-120000.yaml`; `README` → `README-20240101-120000`.
///
/// The stamp goes before the last extension only. A leading dot alone
/// (`.env`) is not an extension.
pub fn stamped_file_name(file_name: &str, now: NaiveDateTime) -> String {
    let stamp = now.format(TIMESTAMP_FORMAT);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{stamp}.{ext}"),
        _ => format!("{file_name}-{stamp}"),
    }
}

/// Check that `dir` names a directory inside the repository and return it
/// without trailing slashes.
pub fn validate_relative_dir(dir: &str) -> Result<&str> {
    let trimmed = dir.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ScmError::Argument(
            "must pass the name of the folder the file will be stored in".to_string(),
        ));
    }
    if trimmed.starts_with('/') {
        return Err(ScmError::Argument(format!(
            "path must be repository-relative: `{dir}`"
        )));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(ScmError::Argument(format!(
                "path contains invalid segment: `{segment}`"
            )));
        }
    }
    Ok(trimmed)
}

pub(crate) fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(ScmError::Argument("must pass a file name".to_string()));
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name == "." || file_name == ".."
    {
        return Err(ScmError::Argument(format!(
            "file name must not contain path separators: `{file_name}`"
        )));
    }
    Ok(())
}

/// Produce the bytes to write for `data` under `options`.
pub fn render(data: &FileData, options: WriteOptions) -> Result<String> {
    match (data, options.serialize_as_structured) {
        (FileData::Record(record), true) => render_yaml(record),
        (FileData::Text(text), false) => Ok(text.clone()),
        (FileData::Text(_), true) => Err(ScmError::Argument(
            "must pass a mapping to write structured data".to_string(),
        )),
        (FileData::Record(_), false) => Err(ScmError::Argument(
            "must pass text to write raw data".to_string(),
        )),
    }
}

/// Block-style YAML with explicit `---` start and `...` end markers.
fn render_yaml(record: &Record) -> Result<String> {
    let body = serde_yaml::to_string(record)
        .map_err(|e| ScmError::Write(format!("could not serialize data: {e}")))?;
    let body = body.strip_prefix("---\n").unwrap_or(&body);
    Ok(format!("---\n{body}...\n"))
}
