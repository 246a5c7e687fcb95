use image::{DynamicImage, GenericImageView, ImageError, ImageReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geometry::PageLayout;

/// Decoded source image. Read-only once loaded.
pub struct SourceImage {
    path: Option<PathBuf>,
    image: DynamicImage,
}

fn decode_error(path: &Path) -> impl Fn(ImageError) -> Error + '_ {
    move |source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>> {
    ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_error(path)(ImageError::IoError(e)))
}

/// read (width, height) from the image header without decoding pixels
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    open_reader(path)?
        .into_dimensions()
        .map_err(decode_error(path))
}

impl SourceImage {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = open_reader(path)?;
        // tall images routinely exceed the default allocation limit
        reader.no_limits();
        let image = reader.decode().map_err(decode_error(path))?;
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            color = ?image.color(),
            "decoded source image"
        );
        Ok(SourceImage {
            path: Some(path.to_path_buf()),
            image,
        })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        SourceImage { path: None, image }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn layout(&self, aspect_ratio: f64) -> Result<PageLayout> {
        let (width, height) = self.dimensions();
        PageLayout::compute(width, height, aspect_ratio)
    }
}
