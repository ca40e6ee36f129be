use crate::error::InstallError;
use crate::types::ArchiveFormat;
use flate2::read::GzDecoder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;

/// Unpacks `archive_path` into `extract_dir` and returns the path of the
/// file named `executable_name` inside it.
pub fn extract_archive(
    archive_path: &Path,
    format: ArchiveFormat,
    extract_dir: &Path,
    executable_name: &str,
) -> Result<PathBuf, InstallError> {
    tracing::info!(
        "Extracting {}...",
        archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    );

    fs::create_dir_all(extract_dir)
        .map_err(|e| InstallError::permission("create directory", extract_dir, e))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, extract_dir)?,
        ArchiveFormat::Zip => extract_zip(archive_path, extract_dir)?,
    }

    let executable = find_executable_in_extracted(extract_dir, executable_name).ok_or_else(|| {
        InstallError::extraction(
            archive_path,
            format!("archive does not contain an executable named {}", executable_name),
        )
    })?;

    tracing::debug!("Found executable: {}", executable.display());
    Ok(executable)
}

fn extract_tar_gz(archive_path: &Path, extract_dir: &Path) -> Result<(), InstallError> {
    let file = fs::File::open(archive_path)
        .map_err(|e| InstallError::extraction(archive_path, e))?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    // `unpack` refuses entries that would land outside `extract_dir`.
    archive
        .unpack(extract_dir)
        .map_err(|e| InstallError::extraction(archive_path, e))?;

    Ok(())
}

fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<(), InstallError> {
    let file = fs::File::open(archive_path)
        .map_err(|e| InstallError::extraction(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| InstallError::extraction(archive_path, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| InstallError::extraction(archive_path, e))?;

        // Security check for path traversal
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(InstallError::extraction(
                archive_path,
                format!("entry '{}' escapes the extraction directory", entry.name()),
            ));
        };
        let outpath = extract_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)
                .map_err(|e| InstallError::permission("create directory", &outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| InstallError::permission("create directory", parent, e))?;
        }
        let mut outfile = fs::File::create(&outpath)
            .map_err(|e| InstallError::permission("create", &outpath, e))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| InstallError::extraction(archive_path, e))?;
    }

    Ok(())
}

/// Shallowest regular file whose name matches `executable_name`.
fn find_executable_in_extracted(extract_dir: &Path, executable_name: &str) -> Option<PathBuf> {
    WalkDir::new(extract_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(executable_name))
        })
        .min_by_key(|entry| entry.depth())
        .map(|entry| entry.into_path())
}
