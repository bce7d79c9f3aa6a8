use crate::config::CropSettings;
use crate::error::AppError;
use crate::walker::{self, is_crop_output, CROP_SUFFIX};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CropReport {
    pub cropped: usize,
    pub undecodable: usize,
    pub too_small: usize,
}

/// Scales every decodable image in `folder` by `scale_percent` and writes a
/// centered `target_pixels` square next to it as `<stem>_crop<.ext>`.
///
/// Undecodable files are skipped. Images too small for the crop after scaling
/// are logged and skipped. Write failures propagate.
pub fn crop_square(folder: &Path, settings: CropSettings) -> Result<CropReport, AppError> {
    log::info!(
        "Cropping images in {:?} to {}px at {}% scale",
        folder,
        settings.target_pixels,
        settings.scale_percent
    );

    let mut report = CropReport::default();
    for path in walker::list_files(folder)? {
        if is_crop_output(&path) {
            log::trace!("Skipping previous crop output: {:?}", path);
            continue;
        }

        let image = match decode(&path) {
            Ok(image) => image,
            Err(e) => {
                log::debug!("Skipping file that is not a readable image: {}", e);
                report.undecodable += 1;
                continue;
            }
        };

        let cropped = match resize_and_center_crop(&path, &image, settings) {
            Ok(cropped) => cropped,
            Err(e @ AppError::Size { .. }) => {
                log::warn!("{}", e);
                report.too_small += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let output = crop_output_path(&path);
        save(&cropped, &output)?;
        log::debug!("Cropped {:?} -> {:?}", path, output);
        report.cropped += 1;
    }

    log::info!(
        "Cropped {} images in {:?} ({} too small, {} unreadable)",
        report.cropped,
        folder,
        report.too_small,
        report.undecodable
    );
    Ok(report)
}

/// Resizes both dimensions by `scale_percent` with an area-averaging filter,
/// then takes the centered square. `path` is only used for error reporting.
pub fn resize_and_center_crop(
    path: &Path,
    image: &DynamicImage,
    settings: CropSettings,
) -> Result<DynamicImage, AppError> {
    let scale = |d: u32| ((d as u64 * settings.scale_percent as u64) / 100) as u32;
    let (width, height) = (scale(image.width()), scale(image.height()));
    let target = settings.target_pixels;

    if width < target || height < target {
        return Err(AppError::Size {
            path: path.to_path_buf(),
            width,
            height,
            target,
        });
    }

    let resized = if (width, height) == (image.width(), image.height()) {
        image.clone()
    } else {
        image.thumbnail_exact(width, height)
    };

    let left = (width - target) / 2;
    let top = (height - target) / 2;
    log::trace!(
        "Crop window for {:?}: {}x{} at ({}, {}) of {}x{}",
        path,
        target,
        target,
        left,
        top,
        width,
        height
    );
    Ok(resized.crop_imm(left, top, target, target))
}

/// The format is sniffed from the bytes: renamed PNGs carry a `.jpg` name.
fn decode(path: &Path) -> Result<DynamicImage, AppError> {
    let decode_error = |e: &dyn std::fmt::Display| AppError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    image::io::Reader::open(path)
        .map_err(|e| decode_error(&e))?
        .with_guessed_format()
        .map_err(|e| decode_error(&e))?
        .decode()
        .map_err(|e| decode_error(&e))
}

fn save(image: &DynamicImage, output: &Path) -> Result<(), AppError> {
    let result = match ImageFormat::from_path(output) {
        Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(image.to_rgb8()).save(output),
        _ => image.save(output),
    };
    result.map_err(|e| AppError::filesystem(output, e))
}

pub fn crop_output_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, CROP_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, CROP_SUFFIX),
    };
    path.with_file_name(name)
}
