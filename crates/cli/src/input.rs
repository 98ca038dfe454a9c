//! Turning command-line input into a data file payload.

use anyhow::{Context, Result, bail};
use gag_scm::{FileData, Record};
use std::io::Read;
use std::path::Path;

/// `key=value` pairs into a record. Values stay strings.
pub fn record_from_fields(fields: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            bail!("field `{field}` must look like KEY=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("field `{field}` has an empty key");
        }
        if record
            .insert(key.to_string(), serde_yaml::Value::String(value.to_string()))
            .is_some()
        {
            bail!("field `{key}` given more than once");
        }
    }
    Ok(record)
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read data from stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read a data file (`-` for stdin). `raw` keeps the text verbatim;
/// otherwise it must hold a YAML or JSON mapping.
pub fn data_from_file(path: &Path, raw: bool) -> Result<FileData> {
    let content = read_source(path)?;
    if raw {
        return Ok(FileData::Text(content));
    }
    let record: Record = serde_yaml::from_str(&content)
        .with_context(|| format!("{} does not hold a mapping of fields", path.display()))?;
    Ok(FileData::Record(record))
}
