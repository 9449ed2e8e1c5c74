//! Directory-to-archive packaging for app bundles.
//!
//! Produces the zip uploaded as an app bundle version: every file below the
//! source directory is stored under its path relative to that directory,
//! using `/` separators regardless of platform.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to write archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Package `source` into `destination_dir/archive_name`.
///
/// The destination directory is created when missing and any archive already
/// at the target path is removed first. Returns the path of the new archive.
pub fn package_directory(source: &Path, destination_dir: &Path, archive_name: &str) -> Result<PathBuf, PackageError> {
    if !source.is_dir() {
        return Err(PackageError::SourceNotFound(source.to_path_buf()));
    }

    fs::create_dir_all(destination_dir).map_err(|source| PackageError::Io {
        path: destination_dir.to_path_buf(),
        source,
    })?;

    let archive_path = destination_dir.join(archive_name);
    remove_existing_archive(&archive_path)?;

    let file = File::create(&archive_path).map_err(|source| PackageError::Io {
        path: archive_path.clone(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let zip_error = |source| PackageError::Zip {
        path: archive_path.clone(),
        source,
    };

    let mut entries = 0usize;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|error| PackageError::Walk {
            path: source.to_path_buf(),
            source: error,
        })?;
        let path = entry.path();
        // Never package the archive into itself when it lives under the source.
        if path == archive_path {
            continue;
        }
        let name = entry_name(source, path);

        if entry.file_type().is_dir() {
            let is_empty = fs::read_dir(path)
                .map_err(|source| PackageError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .next()
                .is_none();
            if is_empty {
                writer.add_directory(format!("{name}/"), options).map_err(zip_error)?;
                entries += 1;
            }
            continue;
        }

        writer.start_file(name.as_str(), options).map_err(zip_error)?;
        let mut input = File::open(path).map_err(|source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        io::copy(&mut input, &mut writer).map_err(|source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(entry = %name, "added archive entry");
        entries += 1;
    }

    writer.finish().map_err(zip_error)?;
    info!(archive = %archive_path.display(), entries, "app package written");
    Ok(archive_path)
}

fn remove_existing_archive(archive_path: &Path) -> Result<(), PackageError> {
    match fs::remove_file(archive_path) {
        Ok(()) => {
            debug!(archive = %archive_path.display(), "removed previous archive");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackageError::Io {
            path: archive_path.to_path_buf(),
            source,
        }),
    }
}

fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
