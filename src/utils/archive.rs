use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use tar::{Archive, Builder};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{Result, UploadError};

/// Build a gzip-compressed tar archive at `output` containing `paths`.
///
/// Gzip runs at maximum compression. Each entry's header carries the file's
/// full path relative to `base`, so extraction reproduces the directory
/// structure.
pub fn create_tar_gz(paths: &[PathBuf], base: &Path, output: &Path) -> Result<()> {
    let out = File::create(output).map_err(|e| UploadError::io(output, e))?;
    let encoder = GzEncoder::new(out, Compression::best());
    let mut builder = Builder::new(encoder);

    for path in paths {
        let name = path.strip_prefix(base).unwrap_or(path);
        builder.append_path_with_name(path, name).map_err(|e| {
            UploadError::Archive(format!(
                "failed to add {} to tar archive: {}",
                path.display(),
                e
            ))
        })?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| UploadError::Archive(format!("failed to finish tar archive: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| UploadError::Archive(format!("failed to finish gzip stream: {}", e)))?;

    info!("Created archive {} ({} entries)", output.display(), paths.len());
    Ok(())
}

/// Build a zip archive at `output` containing `paths`.
///
/// Each entry is stored under its base name only, flattening any directory
/// structure. Callers must not assume paths survive the zip format.
pub fn create_zip(paths: &[PathBuf], output: &Path) -> Result<()> {
    let out = File::create(output).map_err(|e| UploadError::io(output, e))?;
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for path in paths {
        let name = path
            .file_name()
            .ok_or_else(|| {
                UploadError::Archive(format!(
                    "path has no filename component: {}",
                    path.display()
                ))
            })?
            .to_string_lossy()
            .into_owned();

        zip.start_file(name.as_str(), options).map_err(|e| {
            UploadError::Archive(format!("failed to start zip entry {}: {}", name, e))
        })?;

        let mut file = File::open(path).map_err(|e| UploadError::io(path, e))?;
        std::io::copy(&mut file, &mut zip).map_err(|e| {
            UploadError::Archive(format!("failed to write zip entry {}: {}", name, e))
        })?;
    }

    zip.finish()
        .map_err(|e| UploadError::Archive(format!("failed to finalize zip archive: {}", e)))?;

    info!("Created archive {} ({} entries)", output.display(), paths.len());
    Ok(())
}

/// Extract a .tar.gz archive into `dest`.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| UploadError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(dest).map_err(|e| {
        UploadError::Archive(format!(
            "failed to extract {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    debug!("Extracted {} into {}", archive_path.display(), dest.display());
    Ok(())
}

/// Extract a .zip archive into `dest`.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| UploadError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        UploadError::Archive(format!(
            "failed to open zip archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    archive.extract(dest).map_err(|e| {
        UploadError::Archive(format!(
            "failed to extract {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    debug!("Extracted {} into {}", archive_path.display(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_create_tar_gz_fails_on_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.tar.gz");
        let missing = vec![temp_dir.path().join("missing.txt")];

        let result = create_tar_gz(&missing, temp_dir.path(), &output);
        assert!(matches!(result, Err(UploadError::Archive(_))));
    }

    #[test]
    fn test_create_zip_fails_on_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.zip");
        let missing = vec![temp_dir.path().join("missing.txt")];

        assert!(create_zip(&missing, &output).is_err());
    }

    #[test]
    fn test_zip_entries_are_flattened() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir_all(base.join("dir")).unwrap();
        fs::write(base.join("x"), b"x content").unwrap();
        fs::write(base.join("dir/y"), b"y content").unwrap();

        let output = base.join("flat.zip");
        create_zip(&[base.join("x"), base.join("dir/y")], &output).unwrap();

        let file = fs::File::open(&output).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();

        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"y".to_string()));
        assert!(!names.iter().any(|n| n.contains('/')));
    }

    #[test]
    fn test_tar_gz_headers_keep_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir_all(base.join("dir")).unwrap();
        fs::write(base.join("x"), b"x content").unwrap();
        fs::write(base.join("dir/y"), b"y content").unwrap();

        let output = base.join("tree.tar.gz");
        create_tar_gz(&[base.join("x"), base.join("dir/y")], base, &output).unwrap();

        let file = fs::File::open(&output).unwrap();
        let mut archive = Archive::new(GzDecoder::new(file));
        let names: Vec<PathBuf> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().into_owned())
            .collect();

        assert!(names.contains(&PathBuf::from("x")));
        assert!(names.contains(&PathBuf::from("dir/y")));
    }
}
