#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

use crate::models::AggregateResult;

/// Characters that at least one supported filesystem refuses in a name.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("file name can not contain \\/:*?\"<>| symbols")]
    ForbiddenCharacter,
    #[error("file name can not be empty")]
    EmptyName,
    #[error("serializing output: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub fn validate_output_name(name: &str) -> Result<(), OutputError> {
    if name.trim().is_empty() {
        return Err(OutputError::EmptyName);
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(OutputError::ForbiddenCharacter);
    }
    Ok(())
}

/// `<name>.json` in `dir`.
pub fn output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

/// Four-space indented JSON; non-ASCII text is written as is.
pub fn render_document(document: &AggregateResult) -> Result<Vec<u8>, OutputError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    document.serialize(&mut serializer)?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Writes through a sibling temp file and renames it into place, so a crash
/// never leaves a half-written document behind.
pub fn write_document(path: &Path, document: &AggregateResult) -> Result<(), OutputError> {
    let payload = render_document(document)?;
    let write_err = |source| OutputError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}
