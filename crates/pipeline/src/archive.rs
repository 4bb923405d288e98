// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source-zip extraction and artifact-zip creation.

use crate::error::StageError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

/// Extract a zip archive into `dest`.
pub async fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), StageError> {
    let zip_path = zip_path.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_zip_sync(&zip_path, &dest))
        .await
        .map_err(|e| StageError::internal(format!("zip extraction task failed: {}", e)))?
}

fn extract_zip_sync(zip_path: &Path, dest: &Path) -> Result<(), StageError> {
    let bad_zip = |e: &dyn std::fmt::Display| {
        StageError::new(
            format!("extracting {}: {}", zip_path.display(), e),
            "The source package is not a valid zip file.",
        )
    };

    let file = std::fs::File::open(zip_path)
        .map_err(|e| StageError::io("opening source zip", e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| bad_zip(&e))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| bad_zip(&e))?;
        // enclosed_name rejects entries that escape the destination.
        let Some(rel) = entry.enclosed_name() else {
            continue;
        };
        let out = dest.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| StageError::io("creating dir", e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StageError::io("creating dir", e))?;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| StageError::io("reading zip entry", e))?;
        std::fs::write(&out, bytes).map_err(|e| StageError::io("writing zip entry", e))?;
    }
    Ok(())
}

/// Find the application web root inside an extracted source tree: the
/// parent of the shallowest entry named `index.html*`.
pub fn find_web_root(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with("index.html"))
        })
        .min_by_key(|e| e.depth())
        .and_then(|e| e.path().parent().map(Path::to_path_buf))
}

/// Recursively copy a directory tree.
pub fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Zip the given files (flat, by file name) into `dest`.
pub async fn zip_files(files: Vec<PathBuf>, dest: PathBuf) -> Result<(), StageError> {
    tokio::task::spawn_blocking(move || zip_files_sync(&files, &dest))
        .await
        .map_err(|e| StageError::internal(format!("artifact zip task failed: {}", e)))?
}

fn zip_files_sync(files: &[PathBuf], dest: &Path) -> Result<(), StageError> {
    let out =
        std::fs::File::create(dest).map_err(|e| StageError::io("creating artifact zip", e))?;
    let mut writer = zip::ZipWriter::new(out);
    let options = SimpleFileOptions::default();

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        writer
            .start_file(name, options)
            .map_err(|e| StageError::internal(format!("zip write: {}", e)))?;
        let bytes = std::fs::read(file).map_err(|e| StageError::io("reading artifact", e))?;
        writer
            .write_all(&bytes)
            .map_err(|e| StageError::io("writing artifact", e))?;
    }
    writer
        .finish()
        .map_err(|e| StageError::internal(format!("zip finish: {}", e)))?;
    Ok(())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
