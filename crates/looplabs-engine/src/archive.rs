//! Zip packaging of a job directory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{EngineError, EngineResult};

/// Deflate level used for job archives (maximum).
const COMPRESSION_LEVEL: i64 = 9;

/// What ended up in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

/// Compress every file under `src` into the zip file `dst`.
///
/// Entry names are relative to `src` itself, so extracting the archive yields
/// the directory's contents without an extra top-level folder. The call
/// returns once the archive is flushed and closed; on failure the partial
/// archive is removed.
pub async fn archive_directory(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
) -> EngineResult<ArchiveSummary> {
    let src = src.as_ref().to_path_buf();
    let dst = dst.as_ref().to_path_buf();

    tokio::task::spawn_blocking(move || {
        let result = write_archive(&src, &dst);
        if result.is_err() {
            if let Err(e) = std::fs::remove_file(&dst) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove partial archive {}: {}", dst.display(), e);
                }
            }
        }
        result
    })
    .await?
}

fn write_archive(src: &Path, dst: &Path) -> EngineResult<ArchiveSummary> {
    if !src.is_dir() {
        return Err(EngineError::FileNotFound(src.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_files(src, &mut files)?;
    files.retain(|f| f != dst);
    files.sort();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut zip = ZipWriter::new(File::create(dst)?);
    let mut bytes = 0;
    for file in &files {
        let name = entry_name(src, file)?;
        debug!("Adding {} to {}", name, dst.display());
        zip.start_file(name, options)?;
        bytes += io::copy(&mut File::open(file)?, &mut zip)?;
    }

    let out = zip.finish()?;
    out.sync_all()?;

    Ok(ArchiveSummary {
        path: dst.to_path_buf(),
        entries: files.len(),
        bytes,
    })
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let kind = entry.file_type()?;
        if kind.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if kind.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

/// Zip entry name: path relative to `root`, `/`-separated.
fn entry_name(root: &Path, file: &Path) -> EngineResult<String> {
    let relative = file
        .strip_prefix(root)
        .map_err(|_| EngineError::internal(format!("{} is outside {}", file.display(), root.display())))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
