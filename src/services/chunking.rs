use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, TransferError};

/// Block size used when concatenating parts during a merge.
const MERGE_BLOCK_SIZE: usize = 1024 * 1024;

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            TransferError::config(format!("Path has no usable file name: {}", path.display()))
        })
}

/// Creates `dir` if missing, otherwise deletes the regular files inside it
/// so a retried transfer starts from a clean slate.
pub(crate) async fn create_or_clear_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| TransferError::filesystem(dir, e))?;

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| TransferError::filesystem(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TransferError::filesystem(dir, e))?
    {
        let path = entry.path();
        if path.is_file() {
            fs::remove_file(&path)
                .await
                .map_err(|e| TransferError::filesystem(&path, e))?;
        }
    }

    Ok(())
}

/// Splits a file into `parts` sequential chunks inside
/// `<work_dir>/<base_name>/`, named `<base_name>.part<i>`.
///
/// Each part except the last receives exactly `floor(size / parts)` bytes;
/// the last absorbs the remainder. Byte order is preserved and parts are
/// never transformed. Returns the chunk directory.
pub async fn split_file(file_path: &Path, work_dir: &Path, parts: u32) -> Result<PathBuf> {
    split_file_with_cancellation(file_path, work_dir, parts, &CancellationToken::new()).await
}

/// [`split_file`] that stops at the next part boundary once `cancel` is
/// triggered.
pub async fn split_file_with_cancellation(
    file_path: &Path,
    work_dir: &Path,
    parts: u32,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    if parts == 0 {
        return Err(TransferError::config("Part count must be at least 1"));
    }

    let name = base_name(file_path)?;
    let size = fs::metadata(file_path)
        .await
        .map_err(|e| TransferError::filesystem(file_path, e))?
        .len();
    let part_size = size / u64::from(parts);

    let chunk_dir = work_dir.join(&name);
    create_or_clear_dir(&chunk_dir).await?;

    info!(
        "Splitting {} ({} bytes) into {} parts of ~{} bytes",
        file_path.display(),
        size,
        parts,
        part_size
    );

    let mut source = fs::File::open(file_path)
        .await
        .map_err(|e| TransferError::filesystem(file_path, e))?;

    for i in 0..parts {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let part_path = chunk_dir.join(format!("{}.part{}", name, i));
        let mut part_file = fs::File::create(&part_path)
            .await
            .map_err(|e| TransferError::filesystem(&part_path, e))?;

        let written = if i == parts - 1 {
            // Last part takes whatever is left, including the remainder.
            tokio::io::copy(&mut source, &mut part_file)
                .await
                .map_err(|e| TransferError::filesystem(&part_path, e))?
        } else {
            let mut limited = (&mut source).take(part_size);
            tokio::io::copy(&mut limited, &mut part_file)
                .await
                .map_err(|e| TransferError::filesystem(&part_path, e))?
        };

        part_file
            .flush()
            .await
            .map_err(|e| TransferError::filesystem(&part_path, e))?;
        debug!("Wrote part {} ({} bytes)", part_path.display(), written);
    }

    Ok(chunk_dir)
}

/// Reassembles `<base_name>.part0 .. part<parts-1>` from
/// `<work_dir>/<base_name>/` into `<dest_dir>/<base_name>`.
///
/// Verifies that the chunk directory and every part exist before writing
/// any output. Parts are concatenated in index order in fixed-size blocks.
/// On success the part files and the chunk directory are removed
/// best-effort; cleanup failures are logged and do not fail the merge.
pub async fn merge_file_parts(
    dest_dir: &Path,
    work_dir: &Path,
    file_name: &str,
    parts: u32,
) -> Result<PathBuf> {
    merge_file_parts_with_cancellation(dest_dir, work_dir, file_name, parts, &CancellationToken::new()).await
}

/// [`merge_file_parts`] that stops at the next block boundary once `cancel`
/// is triggered. An interrupted merge writes no output to `dest_dir`.
pub async fn merge_file_parts_with_cancellation(
    dest_dir: &Path,
    work_dir: &Path,
    file_name: &str,
    parts: u32,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    if parts == 0 {
        return Err(TransferError::config("Part count must be at least 1"));
    }

    let name = base_name(Path::new(file_name))?;
    let chunk_dir = work_dir.join(&name);

    if !chunk_dir.is_dir() {
        return Err(TransferError::IncompleteTransfer { path: chunk_dir });
    }

    // Verify the set is complete before any output is written.
    let mut part_paths = Vec::with_capacity(parts as usize);
    for i in 0..parts {
        let part_path = chunk_dir.join(format!("{}.part{}", name, i));
        if !part_path.is_file() {
            return Err(TransferError::IncompleteTransfer { path: part_path });
        }
        part_paths.push(part_path);
    }

    let merged_path = chunk_dir.join(&name);
    let mut output = fs::File::create(&merged_path)
        .await
        .map_err(|e| TransferError::filesystem(&merged_path, e))?;

    let mut block = vec![0u8; MERGE_BLOCK_SIZE];
    for part_path in &part_paths {
        let mut part = fs::File::open(part_path)
            .await
            .map_err(|e| TransferError::filesystem(part_path, e))?;
        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let read = part
                .read(&mut block)
                .await
                .map_err(|e| TransferError::filesystem(part_path, e))?;
            if read == 0 {
                break;
            }
            output
                .write_all(&block[..read])
                .await
                .map_err(|e| TransferError::filesystem(&merged_path, e))?;
        }
    }
    output
        .flush()
        .await
        .map_err(|e| TransferError::filesystem(&merged_path, e))?;
    drop(output);

    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| TransferError::filesystem(dest_dir, e))?;
    let dest_path = dest_dir.join(&name);
    fs::copy(&merged_path, &dest_path)
        .await
        .map_err(|e| TransferError::filesystem(&dest_path, e))?;

    info!(
        "Merged {} parts into {}",
        parts,
        dest_path.display()
    );

    // Best-effort cleanup: a failure here is worth a warning but must not
    // turn a completed merge into an error.
    if let Err(e) = fs::remove_dir_all(&chunk_dir).await {
        warn!(
            "Failed to clean up chunk directory {}: {}",
            chunk_dir.display(),
            e
        );
    }

    Ok(dest_path)
}
