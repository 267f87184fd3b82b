//! Deterministic archive writing.
//!
//! Entries are written in the order given, with a pinned timestamp and
//! normalised permissions, so identical inputs always serialise to identical
//! bytes.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use lamina_core::{LayerError, LayerResult};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::ArchiveFormat;

const EXECUTABLE_MODE: u32 = 0o755;
const REGULAR_MODE: u32 = 0o644;

/// One file to be written into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File on disk.
    pub source: PathBuf,
    /// Destination path inside the archive, `/`-separated.
    pub name: String,
    /// Unix permission bits recorded for the entry.
    pub mode: u32,
}

/// List every file under `code` in lexicographic order of its relative path,
/// with `prefix` applied, followed by each `include` file under its base name.
///
/// Dotfiles and dot-directories in the tree are skipped, which keeps local
/// tool state such as `.lamina/` and `.git/` out of the archive. Include
/// files are taken as given.
pub fn collect_entries(
    code: &Path,
    prefix: Option<&str>,
    include: &[PathBuf],
) -> LayerResult<Vec<ArchiveEntry>> {
    let mut tree = Vec::new();
    let walker = WalkDir::new(code)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(code)
            .map_err(|e| LayerError::internal(format!("walked outside source dir: {e}")))?;
        tree.push((archive_name(relative), entry.path().to_path_buf()));
    }

    // Order must not depend on directory iteration order.
    tree.sort_by(|a, b| a.0.cmp(&b.0));

    let prefix = prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty());
    let mut entries = Vec::with_capacity(tree.len() + include.len());
    for (relative, source) in tree {
        let name = match prefix {
            Some(prefix) => format!("{prefix}/{relative}"),
            None => relative,
        };
        entries.push(ArchiveEntry {
            mode: file_mode(&source)?,
            source,
            name,
        });
    }

    for extra in include {
        let name = extra
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LayerError::config(format!("include path has no file name: {}", extra.display()))
            })?;
        entries.push(ArchiveEntry {
            mode: file_mode(extra)?,
            source: extra.clone(),
            name,
        });
    }

    Ok(entries)
}

/// Write `entries` to `output` in the given format.
///
/// The archive is written beside `output` and renamed into place once
/// complete, so an interrupted run never leaves a half-written archive that a
/// later run would reuse.
pub fn write_archive(
    format: ArchiveFormat,
    entries: &[ArchiveEntry],
    output: &Path,
) -> LayerResult<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let partial = partial_path(output);
    let result = match format {
        ArchiveFormat::Zip => write_zip(entries, &partial),
        ArchiveFormat::Tar => write_tar(entries, &partial),
    };
    if let Err(e) = result {
        std::fs::remove_file(&partial).ok();
        return Err(e);
    }
    std::fs::rename(&partial, output)?;

    debug!(
        path = %output.display(),
        format = %format,
        entries = entries.len(),
        "archive written"
    );
    Ok(())
}

fn write_zip(entries: &[ArchiveEntry], output: &Path) -> LayerResult<()> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(output)?));

    for entry in entries {
        // zip timestamps cannot predate 1980, so the zip epoch is the pin.
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(entry.mode);
        zip.start_file(entry.name.as_str(), options)
            .map_err(zip_error)?;
        let mut source = File::open(&entry.source)?;
        io::copy(&mut source, &mut zip)?;
    }

    let mut writer = zip.finish().map_err(zip_error)?;
    io::Write::flush(&mut writer)?;
    Ok(())
}

fn write_tar(entries: &[ArchiveEntry], output: &Path) -> LayerResult<()> {
    let mut builder = tar::Builder::new(BufWriter::new(File::create(output)?));
    builder.mode(tar::HeaderMode::Deterministic);

    for entry in entries {
        let source = File::open(&entry.source)?;
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(source.metadata()?.len());
        header.set_mode(entry.mode);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        builder.append_data(&mut header, &entry.name, source)?;
    }

    let mut writer = builder.into_inner()?;
    io::Write::flush(&mut writer)?;
    Ok(())
}

fn zip_error(e: zip::result::ZipError) -> LayerError {
    LayerError::Archive(e.to_string())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

/// Relative path rendered with `/` separators regardless of platform.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(path: &Path) -> LayerResult<u32> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(if mode & 0o111 != 0 {
        EXECUTABLE_MODE
    } else {
        REGULAR_MODE
    })
}

#[cfg(not(unix))]
fn file_mode(path: &Path) -> LayerResult<u32> {
    std::fs::metadata(path)?;
    Ok(REGULAR_MODE)
}
