//! Lazy slicing of the source image into page bands.

use clap::ValueEnum;
use image::{ColorType, DynamicImage, Rgb, RgbImage, RgbaImage};

use crate::error::{Error, Result};
use crate::geometry::{BandRegion, PageLayout};
use crate::progress::{CancelFlag, NoProgress, ProgressSink};
use crate::source::SourceImage;

/// Pixel format every band is delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// three 8-bit channels, no alpha
    Rgb8,
}

impl ColorMode {
    pub fn channels(self) -> u8 {
        match self {
            ColorMode::Rgb8 => 3,
        }
    }

    pub fn pdf_color_space(self) -> &'static [u8] {
        match self {
            ColorMode::Rgb8 => b"DeviceRGB",
        }
    }
}

/// How the final, usually shorter, band fills its page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LastPage {
    /// stretch the band over the whole page
    #[default]
    Stretch,
    /// pad the band with white rows to a full page height
    Pad,
}

/// One page worth of source pixels.
#[derive(Debug, Clone)]
pub struct PageBand {
    pub region: BandRegion,
    pub pixels: RgbImage,
}

impl PageBand {
    pub fn mode(&self) -> ColorMode {
        ColorMode::Rgb8
    }
}

/// Iterator over the page bands of a source image, top to bottom.
///
/// Holds no state beyond its position, so building a new one from the same
/// inputs yields identical bands.
pub struct Paginator<'a> {
    source: &'a SourceImage,
    layout: &'a PageLayout,
    last_page: LastPage,
    progress: &'a dyn ProgressSink,
    cancel: Option<&'a CancelFlag>,
    next: u32,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a SourceImage, layout: &'a PageLayout) -> Self {
        Paginator {
            source,
            layout,
            last_page: LastPage::default(),
            progress: &NoProgress,
            cancel: None,
            next: 0,
            done: false,
        }
    }

    pub fn last_page(mut self, last_page: LastPage) -> Self {
        self.last_page = last_page;
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn render(&self, region: BandRegion) -> Result<PageBand> {
        let (width, height) = self.source.dimensions();
        if (width, height) != (self.layout.source_width(), self.layout.source_height()) {
            return Err(Error::InvalidDimension(format!(
                "layout is for {}x{} but source is {}x{}",
                self.layout.source_width(),
                self.layout.source_height(),
                width,
                height
            )));
        }

        let cropped =
            self.source
                .image()
                .crop_imm(region.left, region.top, region.width(), region.height());
        let mut pixels = to_rgb8(&cropped, region.index)?;

        let is_last = region.index + 1 == self.layout.page_count();
        if is_last && self.last_page == LastPage::Pad {
            let full = self.layout.page_height_px().round() as u32;
            if pixels.height() < full {
                pixels = pad_to_height(&pixels, full);
            }
        }

        Ok(PageBand { region, pixels })
    }
}

impl Iterator for Paginator<'_> {
    type Item = Result<PageBand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.is_some_and(|c| c.is_cancelled()) {
            self.done = true;
            return Some(Err(Error::Cancelled));
        }
        let region = self.layout.band_region(self.next)?;

        match self.render(region) {
            Ok(band) => {
                tracing::debug!(
                    band = region.index,
                    top = region.top,
                    bottom = region.bottom,
                    "sliced band"
                );
                self.next += 1;
                self.progress.report(self.layout.progress_after(region.index));
                Some(Ok(band))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done {
            0
        } else {
            (self.layout.page_count() - self.next) as usize
        };
        (0, Some(remaining))
    }
}

/// Convert to 8-bit RGB, compositing any alpha channel over white.
pub fn to_rgb8(image: &DynamicImage, band: u32) -> Result<RgbImage> {
    match image.color() {
        ColorType::L8 | ColorType::L16 | ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
            Ok(image.to_rgb8())
        }
        ColorType::La8
        | ColorType::La16
        | ColorType::Rgba8
        | ColorType::Rgba16
        | ColorType::Rgba32F => Ok(flatten_on_white(&image.to_rgba8())),
        other => Err(Error::encoding(
            band,
            format!("unsupported source colour type {:?}", other),
        )),
    }
}

fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u16;
        for c in 0..3 {
            let blended = (src[c] as u16 * alpha + 255 * (255 - alpha) + 127) / 255;
            dst[c] = blended as u8;
        }
    }
    out
}

fn pad_to_height(pixels: &RgbImage, height: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(pixels.width(), height, Rgb([255, 255, 255]));
    image::imageops::replace(&mut canvas, pixels, 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ISO_216_RATIO;
    use image::Rgba;
    use std::cell::RefCell;

    /// each row painted with its own index so bands can be checked by content
    fn striped(width: u32, height: u32) -> SourceImage {
        let img = RgbImage::from_fn(width, height, |_, y| {
            Rgb([(y % 256) as u8, (y / 256 % 256) as u8, 7])
        });
        SourceImage::from_image(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn yields_one_band_per_page() {
        let source = striped(100, 1000);
        let layout = source.layout(ISO_216_RATIO).unwrap();
        let bands: Vec<PageBand> = Paginator::new(&source, &layout)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(bands.len() as u32, layout.page_count());
        assert_eq!(bands.len(), 8);

        let mut expected_top = 0;
        for band in &bands {
            assert_eq!(band.region.top, expected_top);
            assert_eq!(band.pixels.width(), 100);
            assert_eq!(band.pixels.height(), band.region.height());
            // first row of the band is the source row at `top`
            let first = band.pixels.get_pixel(0, 0);
            assert_eq!(first[0] as u32, band.region.top % 256);
            expected_top = band.region.bottom;
        }
        assert_eq!(expected_top, 1000);
    }

    #[test]
    fn single_page_image() {
        let source = striped(800, 900);
        let layout = source.layout(ISO_216_RATIO).unwrap();
        let bands: Vec<PageBand> = Paginator::new(&source, &layout)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!((bands[0].region.top, bands[0].region.bottom), (0, 900));
    }

    #[test]
    fn rerunning_gives_identical_bands() {
        let source = striped(33, 500);
        let layout = source.layout(1.7).unwrap();
        let first: Vec<_> = Paginator::new(&source, &layout)
            .map(|b| b.unwrap().region)
            .collect();
        let second: Vec<_> = Paginator::new(&source, &layout)
            .map(|b| b.unwrap().region)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let source = striped(10, 123);
        let layout = source.layout(1.0).unwrap();
        let seen = RefCell::new(Vec::new());
        let sink = |p: u8| seen.borrow_mut().push(p);
        let count = Paginator::new(&source, &layout)
            .with_progress(&sink)
            .filter(|b| b.is_ok())
            .count();

        let seen = seen.into_inner();
        assert_eq!(count, 13);
        assert_eq!(seen.len(), 13);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn alpha_is_flattened_over_white() {
        let img = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([10, 20, 30, 255])
            }
        });
        let source = SourceImage::from_image(DynamicImage::ImageRgba8(img));
        let layout = source.layout(1.0).unwrap();
        let band = Paginator::new(&source, &layout).next().unwrap().unwrap();
        assert_eq!(band.mode(), ColorMode::Rgb8);
        assert_eq!(*band.pixels.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*band.pixels.get_pixel(3, 3), Rgb([10, 20, 30]));
    }

    #[test]
    fn grayscale_is_expanded_to_rgb() {
        let img = image::GrayImage::from_pixel(3, 3, image::Luma([90]));
        let source = SourceImage::from_image(DynamicImage::ImageLuma8(img));
        let layout = source.layout(1.0).unwrap();
        let band = Paginator::new(&source, &layout).next().unwrap().unwrap();
        assert_eq!(*band.pixels.get_pixel(1, 1), Rgb([90, 90, 90]));
    }

    #[test]
    fn pad_fills_last_page_with_white() {
        let source = striped(10, 25);
        let layout = source.layout(1.0).unwrap();
        let bands: Vec<PageBand> = Paginator::new(&source, &layout)
            .last_page(LastPage::Pad)
            .collect::<Result<_>>()
            .unwrap();
        let last = bands.last().unwrap();
        assert_eq!(last.region.height(), 5);
        assert_eq!(last.pixels.height(), 10);
        assert_eq!(*last.pixels.get_pixel(0, 9), Rgb([255, 255, 255]));
        assert_eq!(bands[0].pixels.height(), 10);
    }

    #[test]
    fn cancel_stops_between_bands() {
        let source = striped(10, 100);
        let layout = source.layout(1.0).unwrap();
        let cancel = CancelFlag::new();
        let mut pages = Paginator::new(&source, &layout).with_cancel(&cancel);

        assert!(pages.next().unwrap().is_ok());
        cancel.cancel();
        assert!(matches!(pages.next(), Some(Err(Error::Cancelled))));
        assert!(pages.next().is_none());
    }

    #[test]
    fn mismatched_layout_is_rejected() {
        let source = striped(10, 100);
        let layout = PageLayout::compute(20, 100, 1.0).unwrap();
        let first = Paginator::new(&source, &layout).next().unwrap();
        assert!(matches!(first, Err(Error::InvalidDimension(_))));
    }
}
