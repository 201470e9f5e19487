//! Decoded image plus the color mode it had on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, ImageFormat, RgbImage};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// PNG IHDR color-type byte offset: signature(8) + length(4) + "IHDR"(4) + width(4) + height(4) + depth(1).
const PNG_COLOR_TYPE_OFFSET: usize = 25;
const PNG_COLOR_TYPE_PALETTE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    /// RGB with 16 bits per channel.
    Rgb16,
    /// RGB with 32-bit float channels.
    Rgb32F,
    Rgba,
    Grayscale,
    GrayscaleAlpha,
    Palette,
    Other,
}

impl ColorMode {
    fn from_color_type(color: ColorType) -> Self {
        match color {
            ColorType::Rgb8 => Self::Rgb,
            ColorType::Rgb16 => Self::Rgb16,
            ColorType::Rgb32F => Self::Rgb32F,
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => Self::Rgba,
            ColorType::L8 | ColorType::L16 => Self::Grayscale,
            ColorType::La8 | ColorType::La16 => Self::GrayscaleAlpha,
            _ => Self::Other,
        }
    }

    /// JPEG output is always written as 8-bit RGB.
    pub fn is_encodable(self) -> bool {
        self == Self::Rgb
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rgb => "RGB",
            Self::Rgb16 => "16-bit RGB",
            Self::Rgb32F => "32-bit float RGB",
            Self::Rgba => "RGBA",
            Self::Grayscale => "grayscale",
            Self::GrayscaleAlpha => "grayscale+alpha",
            Self::Palette => "palette",
            Self::Other => "other",
        })
    }
}

/// An image read from disk.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub format: Option<ImageFormat>,
    pub image: DynamicImage,
    source_mode: ColorMode,
}

impl LoadedImage {
    /// Color mode of the file on disk. Palette images are expanded by the
    /// decoder, so this can differ from the pixel buffer's layout.
    pub fn color_mode(&self) -> ColorMode {
        self.source_mode
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// 8-bit RGB pixels, plus the original mode if a conversion happened.
    pub(crate) fn to_encodable(&self) -> (RgbImage, Option<ColorMode>) {
        match &self.image {
            DynamicImage::ImageRgb8(rgb) if self.source_mode.is_encodable() => (rgb.clone(), None),
            other => (other.to_rgb8(), Some(self.source_mode)),
        }
    }
}

/// Decode an image file. Corrupt or unsupported data is a [`Error::Decode`].
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes).ok();
    let image = image::load_from_memory(&bytes).map_err(|e| Error::Decode(e.to_string()))?;

    let source_mode = match format {
        Some(ImageFormat::Gif) => ColorMode::Palette,
        Some(ImageFormat::Png) if bytes.get(PNG_COLOR_TYPE_OFFSET) == Some(&PNG_COLOR_TYPE_PALETTE) => {
            ColorMode::Palette
        }
        _ => ColorMode::from_color_type(image.color()),
    };

    log::debug!(
        "Loaded {} ({}x{}, {source_mode}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        format
    );

    Ok(LoadedImage {
        path: path.to_path_buf(),
        format,
        image,
        source_mode,
    })
}

/// A temp file in the same directory as `dest`, so it can be renamed onto
/// `dest` atomically.
pub(crate) fn temp_beside(dest: &Path) -> std::io::Result<NamedTempFile> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    NamedTempFile::new_in(dir)
}
