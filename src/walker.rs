use crate::error::AppError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the rename stage treats as images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Stem suffix marking files written by the crop stage.
pub const CROP_SUFFIX: &str = "_crop";

pub fn is_crop_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map_or(false, |stem| stem.ends_with(CROP_SUFFIX))
}

/// Creates `path` and any missing parents. An existing directory is fine.
pub fn ensure_directory(path: &Path) -> Result<(), AppError> {
    if path.is_dir() {
        log::trace!("Directory already present: {:?}", path);
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|e| AppError::filesystem(path, e))?;
    log::debug!("Created directory: {:?}", path);
    Ok(())
}

/// Regular files directly inside `folder`, sorted by file name.
pub fn list_files(folder: &Path) -> Result<Vec<PathBuf>, AppError> {
    log::debug!("Listing files in {:?}", folder);

    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            log::trace!("Discovered file: {:?}", entry.path());
            files.push(entry.into_path());
        } else {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
        }
    }
    Ok(files)
}

/// Files in `folder` whose extension is one of [`IMAGE_EXTENSIONS`], compared
/// case-insensitively.
pub fn list_image_files(folder: &Path) -> Result<Vec<PathBuf>, AppError> {
    let files = list_files(folder)?
        .into_iter()
        .filter(|path| {
            match path.extension().and_then(|s| s.to_str()) {
                Some(ext) if IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => true,
                Some(_) => {
                    log::trace!("Skipping file due to unsupported extension: {:?}", path);
                    false
                }
                None => {
                    log::trace!("Skipping file with no extension: {:?}", path);
                    false
                }
            }
        })
        .collect();
    Ok(files)
}
