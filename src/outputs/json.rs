//! Crash-safe JSON persistence of a category's postings.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── db_tecnologia.json       # {"vagas": [...]}
//! ├── db_tecnologia.json.tmp   # only exists while a write is in flight
//! └── db_direito.json
//! ```
//!
//! The document is written to a sibling temp file, flushed to disk, then
//! renamed over the destination. Readers only ever see the previous complete
//! file or the new complete file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

use crate::error::{Result, ScrapeError};
use crate::models::{Posting, PostingsDocument};

/// Serialize postings as `{"vagas": [...]}` with 4-space indentation.
///
/// Output is a pure function of the input, byte for byte.
pub fn serialize_document(postings: &[Posting]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    PostingsDocument { vagas: postings }
        .serialize(&mut ser)
        .map_err(|e| ScrapeError::persistence("<memory>", e))?;
    Ok(bytes)
}

/// Temp file used while replacing `destination`.
pub fn temp_path(destination: &Path) -> Result<PathBuf> {
    let name = destination
        .file_name()
        .ok_or_else(|| ScrapeError::persistence(destination, "destination has no file name"))?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(destination.with_file_name(tmp_name))
}

/// Atomically replace `destination` with the serialized postings.
///
/// # Arguments
///
/// * `postings` - The deduplicated postings of one category
/// * `destination` - Final path, e.g. `output_dir/db_tecnologia.json`
///
/// # Returns
///
/// `Ok(())` once the new document is in place. On error the destination is
/// left as it was, the temp file is removed and
/// [`ScrapeError::PersistenceFailure`] is returned.
#[instrument(
    level = "info",
    skip_all,
    fields(path = %destination.display(), count = postings.len())
)]
pub async fn persist_atomic(postings: &[Posting], destination: &Path) -> Result<()> {
    let bytes = serialize_document(postings)?;
    let tmp = temp_path(destination)?;

    let outcome = match stage(&bytes, &tmp).await {
        Ok(()) => commit(&tmp, destination).await,
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        let _ = fs::remove_file(&tmp).await;
        error!(error = %e, "Persistence failed; destination left untouched");
        return Err(ScrapeError::persistence(destination, e));
    }

    info!("Postings saved atomically");
    Ok(())
}

/// Write `bytes` to `tmp` and flush them to stable storage.
async fn stage(bytes: &[u8], tmp: &Path) -> std::io::Result<()> {
    if let Some(parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

/// Replace `destination` with `tmp` in a single rename.
async fn commit(tmp: &Path, destination: &Path) -> std::io::Result<()> {
    fs::rename(tmp, destination).await
}
