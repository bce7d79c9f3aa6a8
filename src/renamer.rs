use crate::error::AppError;
use crate::query::Query;
use crate::walker;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub fn canonical_name(query: &Query, index: usize) -> String {
    format!("{}_{}.jpg", query, index)
}

/// Renames every recognized image directly inside `folder` to
/// `<query>_<k>.jpg`, k counting from 1 in file name order. The extension is
/// forced to `.jpg`; the bytes are not transcoded.
///
/// Files move through temporary names first, so a folder that was already
/// renamed can be renamed again. A target name held by a file outside the
/// renamed set is an error, never overwritten. Outputs of the crop stage
/// keep their names.
pub fn normalize_names(folder: &Path, query: &Query) -> Result<usize, AppError> {
    log::info!("Renaming images in {:?} for query {:?}", folder, query.as_str());

    let files: Vec<PathBuf> = walker::list_image_files(folder)?
        .into_iter()
        .filter(|path| {
            let crop = walker::is_crop_output(path);
            if crop {
                log::trace!("Leaving crop output in place: {:?}", path);
            }
            !crop
        })
        .collect();
    if files.is_empty() {
        log::info!("No images to rename in {:?}", folder);
        return Ok(0);
    }

    let sources: HashSet<&PathBuf> = files.iter().collect();
    let targets: Vec<PathBuf> = (1..=files.len())
        .map(|k| folder.join(canonical_name(query, k)))
        .collect();

    for target in &targets {
        if target.exists() && !sources.contains(target) {
            return Err(AppError::filesystem(
                target,
                "target name already taken by a file that is not being renamed",
            ));
        }
    }

    let staged = stage(folder, &files)?;
    finish(&staged, &files, &targets)?;

    log::info!("Renamed {} images in {:?}", files.len(), folder);
    Ok(files.len())
}

/// Moves each file to a unique temporary name. On failure the files already
/// moved are put back before the error is returned.
fn stage(folder: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let pid = std::process::id();
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());

    for (i, file) in files.iter().enumerate() {
        let temp = folder.join(format!(".rename-{}-{}.tmp", pid, i + 1));
        let result = if temp.exists() {
            Err(AppError::filesystem(&temp, "temporary name already exists"))
        } else {
            fs::rename(file, &temp).map_err(|e| AppError::filesystem(file, e))
        };

        if let Err(e) = result {
            for (moved, original) in staged.iter().zip(files) {
                if let Err(undo) = fs::rename(moved, original) {
                    log::error!("Could not restore {:?} to {:?}: {}", moved, original, undo);
                }
            }
            return Err(e);
        }
        log::trace!("Staged {:?} as {:?}", file, temp);
        staged.push(temp);
    }
    Ok(staged)
}

/// Moves staged files onto their targets. If one move fails, every file
/// not yet moved goes back to its original name when that name is free; the
/// error lists the temporary paths that could not be restored.
fn finish(staged: &[PathBuf], originals: &[PathBuf], targets: &[PathBuf]) -> Result<(), AppError> {
    for (i, (temp, target)) in staged.iter().zip(targets).enumerate() {
        let result = if target.exists() {
            Err(AppError::filesystem(target, "target appeared during rename"))
        } else {
            fs::rename(temp, target).map_err(|e| AppError::filesystem(temp, e))
        };

        match result {
            Ok(()) => log::debug!("Renamed {:?} -> {:?}", temp, target),
            Err(e) => {
                let stranded = restore(&staged[i..], &originals[i..]);
                if stranded.is_empty() {
                    return Err(e);
                }
                let path = match &e {
                    AppError::Filesystem { path, .. } => path.clone(),
                    _ => temp.clone(),
                };
                return Err(AppError::filesystem(
                    path,
                    format!("{}; images left under temporary names: {:?}", e, stranded),
                ));
            }
        }
    }
    Ok(())
}

/// Returns the temporary paths that are still holding data.
fn restore(staged: &[PathBuf], originals: &[PathBuf]) -> Vec<PathBuf> {
    let mut stranded = Vec::new();
    for (temp, original) in staged.iter().zip(originals) {
        if original.exists() {
            log::error!("Cannot restore {:?}: {:?} is taken", temp, original);
            stranded.push(temp.clone());
        } else if let Err(undo) = fs::rename(temp, original) {
            log::error!("Could not restore {:?} to {:?}: {}", temp, original, undo);
            stranded.push(temp.clone());
        } else {
            log::debug!("Restored {:?} to {:?}", temp, original);
        }
    }
    stranded
}
