use std::{
    io::{self, ErrorKind},
    path::Path,
};

use async_trait::async_trait;

use crate::{ConflabError, Result, value::ConfigValue};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads raw source bytes.
///
/// Implementations report a missing file as `Ok(None)`; the loader skips
/// those silently.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Reads the whole file at `path`.
    ///
    /// # Errors
    /// Returns any I/O error other than the file not existing.
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;
}

/// Reads sources from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

#[async_trait]
impl SourceReader for FsReader {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Parses a JSON document, tolerating a leading byte-order mark.
///
/// # Errors
/// * `ConflabError::Parse` - If the bytes are not valid JSON; carries `path`
pub fn parse_document(bytes: &[u8], path: &Path) -> Result<ConfigValue> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ConflabError::parse(e, path))?;

    Ok(ConfigValue::from(value))
}

/// Reads and parses `path`, returning `None` if it does not exist.
pub(super) async fn read_document(
    reader: &dyn SourceReader,
    path: &Path,
) -> Result<Option<ConfigValue>> {
    let Some(bytes) = reader
        .read(path)
        .await
        .map_err(|e| ConflabError::io(e, path))?
    else {
        return Ok(None);
    };

    parse_document(&bytes, path).map(Some)
}
