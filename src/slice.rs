//! Write each page band as a standalone image file.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::encode::encode_jpeg;
use crate::paginate::{LastPage, Paginator, PageBand};
use crate::parse::{ImageFormat, PngCompression};
use crate::progress::ProgressSink;
use crate::source::SourceImage;

#[derive(Debug, Clone, Copy)]
pub struct SliceOptions {
    pub aspect_ratio: f64,
    pub format: ImageFormat,
    pub compress: PngCompression,
    pub quality: u8,
    pub last_page: LastPage,
}

fn encode_png(band: &PageBand, compress: PngCompression, writer: impl Write) -> Result<()> {
    let writer = std::io::BufWriter::new(writer);
    let mut encoder = png::Encoder::new(writer, band.pixels.width(), band.pixels.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    // - fast: fastest encoding, larger files (fdeflate + Paeth)
    // - small: smaller files, slower encoding (zlib + NoFilter)
    match compress {
        PngCompression::Fast => {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::Filter::Paeth);
        }
        PngCompression::Small => {
            encoder.set_compression(png::Compression::Balanced);
            encoder.set_filter(png::Filter::NoFilter);
        }
    }

    let mut writer = encoder
        .write_header()
        .context("Failed to write PNG header")?;
    writer
        .write_image_data(band.pixels.as_raw())
        .context("Failed to encode PNG data")?;
    Ok(())
}

/// Slice `input` into page bands and write them to `output_dir` as
/// `page_0001.<ext>`, `page_0002.<ext>`, ... Returns the written paths.
pub fn slice_image(
    input: &Path,
    output_dir: &Path,
    opts: &SliceOptions,
    progress: &dyn ProgressSink,
) -> Result<Vec<PathBuf>> {
    let source = SourceImage::open(input)?;
    let layout = source.layout(opts.aspect_ratio)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(layout.page_count() as usize);
    let pages = Paginator::new(&source, &layout)
        .last_page(opts.last_page)
        .with_progress(progress);
    for band in pages {
        let band = band?;
        let path = output_dir.join(format!(
            "page_{:04}.{}",
            band.region.index + 1,
            opts.format.extension()
        ));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let encoded = match opts.format {
            ImageFormat::Png => encode_png(&band, opts.compress, file),
            ImageFormat::Jpg => encode_jpeg(&band.pixels, opts.quality, file)
                .context("Failed to encode JPEG data"),
        };
        encoded.with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use image::{GenericImageView, Rgb, RgbImage};

    fn opts(format: ImageFormat) -> SliceOptions {
        SliceOptions {
            aspect_ratio: 1.0,
            format,
            compress: PngCompression::Fast,
            quality: 80,
            last_page: LastPage::Stretch,
        }
    }

    #[test]
    fn writes_one_png_per_band() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        RgbImage::from_fn(10, 25, |_, y| Rgb([y as u8, 0, 0]))
            .save(&input)
            .unwrap();

        let out = dir.path().join("pages");
        let written = slice_image(&input, &out, &opts(ImageFormat::Png), &NoProgress).unwrap();
        assert_eq!(
            written,
            vec![
                out.join("page_0001.png"),
                out.join("page_0002.png"),
                out.join("page_0003.png"),
            ]
        );

        let last = image::open(&written[2]).unwrap();
        assert_eq!(last.dimensions(), (10, 5));
        assert_eq!(last.get_pixel(0, 0)[0], 20);
    }

    #[test]
    fn writes_jpegs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        RgbImage::from_pixel(16, 40, Rgb([200, 100, 50]))
            .save(&input)
            .unwrap();

        let written =
            slice_image(&input, dir.path(), &opts(ImageFormat::Jpg), &NoProgress).unwrap();
        assert_eq!(written.len(), 3);
        let bytes = std::fs::read(&written[0]).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
