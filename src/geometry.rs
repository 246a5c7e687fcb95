//! Page layout for slicing a tall image into fixed-ratio pages.
//!
//! The page is always exactly as wide as the source image, so only the page
//! height depends on the aspect ratio. Band boundaries are computed once here
//! and reused by everything downstream.

use crate::error::{Error, Result};

/// Height-to-width ratio of ISO 216 (A-series) paper.
pub const ISO_216_RATIO: f64 = 1.4142;

/// Largest page edge, in points, that PDF viewers are required to support.
pub const MAX_PAGE_EDGE_PT: f32 = 14_400.0;

/// quotients this close to an integer count as exact multiples
const EXACT_TOLERANCE: f64 = 1e-9;

pub fn validate_aspect_ratio(aspect_ratio: f64) -> Result<()> {
    if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
        return Err(Error::InvalidDimension(format!(
            "aspect ratio must be a positive number, got {}",
            aspect_ratio
        )));
    }
    Ok(())
}

/// Maps source pixels to PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageUnit {
    /// pixels per inch of the source image; 72 makes one pixel one point
    pub dpi: u32,
}

impl Default for PageUnit {
    fn default() -> Self {
        PageUnit { dpi: 72 }
    }
}

impl PageUnit {
    /// A zero dpi has no finite point size.
    pub fn validate(self) -> Result<()> {
        if self.dpi == 0 {
            return Err(Error::InvalidDimension(
                "dpi must be at least 1, got 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn points_per_pixel(self) -> f32 {
        72.0 / self.dpi as f32
    }
}

/// Page rectangle in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub fn exceeds_pdf_limit(&self) -> bool {
        self.width_pt > MAX_PAGE_EDGE_PT || self.height_pt > MAX_PAGE_EDGE_PT
    }
}

/// Derived page geometry for one conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    source_width: u32,
    source_height: u32,
    aspect_ratio: f64,
    page_height_px: f64,
    page_count: u32,
}

/// Horizontal slice `[top, bottom)` of the source, spanning its full width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandRegion {
    pub index: u32,
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl BandRegion {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

impl PageLayout {
    /// Compute the layout for a `width_px` × `height_px` image on pages whose
    /// height is `aspect_ratio` times their width.
    pub fn compute(width_px: u32, height_px: u32, aspect_ratio: f64) -> Result<Self> {
        if width_px == 0 || height_px == 0 {
            return Err(Error::InvalidDimension(format!(
                "image must be at least 1x1 pixels, got {}x{}",
                width_px, height_px
            )));
        }
        validate_aspect_ratio(aspect_ratio)?;

        let page_height_px = width_px as f64 * aspect_ratio;
        if page_height_px < 1.0 {
            return Err(Error::InvalidDimension(format!(
                "page height {:.3}px is less than one pixel (width {}, ratio {})",
                page_height_px, width_px, aspect_ratio
            )));
        }

        let quotient = height_px as f64 / page_height_px;
        let nearest = quotient.round();
        let pages = if (quotient - nearest).abs() < EXACT_TOLERANCE {
            nearest
        } else {
            quotient.ceil()
        };
        // page_height_px >= 1 keeps this within 1..=height_px
        let page_count = (pages as u32).clamp(1, height_px);

        Ok(PageLayout {
            source_width: width_px,
            source_height: height_px,
            aspect_ratio,
            page_height_px,
            page_count,
        })
    }

    pub fn source_width(&self) -> u32 {
        self.source_width
    }

    pub fn source_height(&self) -> u32 {
        self.source_height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Page width in source pixels (always the image width).
    pub fn page_width_px(&self) -> u32 {
        self.source_width
    }

    /// Page height in source pixels; generally fractional.
    pub fn page_height_px(&self) -> f64 {
        self.page_height_px
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Row at which band `index` starts; `page_count` maps to the image height.
    fn boundary(&self, index: u32) -> u32 {
        if index == 0 {
            return 0;
        }
        if index >= self.page_count {
            return self.source_height;
        }
        let rounded = (index as f64 * self.page_height_px).round() as u64;
        // every remaining band keeps at least one row
        let ceiling = (self.source_height - (self.page_count - index)) as u64;
        rounded.min(ceiling) as u32
    }

    /// Region of band `index`, or `None` past the last page.
    pub fn band_region(&self, index: u32) -> Option<BandRegion> {
        (index < self.page_count).then(|| BandRegion {
            index,
            top: self.boundary(index),
            bottom: self.boundary(index + 1),
            left: 0,
            right: self.source_width,
        })
    }

    /// All band regions, top to bottom.
    pub fn regions(&self) -> impl Iterator<Item = BandRegion> + '_ {
        (0..self.page_count).filter_map(move |i| self.band_region(i))
    }

    /// Completion percentage once band `index` has been produced.
    pub fn progress_after(&self, index: u32) -> u8 {
        let done = (index + 1).min(self.page_count) as f64;
        (done / self.page_count as f64 * 100.0).round() as u8
    }

    /// Page rectangle in points for the given pixel-to-point mapping.
    pub fn page_size(&self, unit: PageUnit) -> PageSize {
        let scale = unit.points_per_pixel();
        PageSize {
            width_pt: self.source_width as f32 * scale,
            height_pt: (self.page_height_px as f32) * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(layout: &PageLayout) -> Vec<(u32, u32)> {
        layout.regions().map(|r| (r.top, r.bottom)).collect()
    }

    #[test]
    fn single_page_when_image_is_shorter_than_page() {
        let layout = PageLayout::compute(800, 900, ISO_216_RATIO).unwrap();
        assert!((layout.page_height_px() - 1131.36).abs() < 1e-6);
        assert_eq!(layout.page_count(), 1);
        assert_eq!(bounds(&layout), vec![(0, 900)]);
    }

    #[test]
    fn multi_page_bands() {
        let layout = PageLayout::compute(1000, 5000, ISO_216_RATIO).unwrap();
        assert!((layout.page_height_px() - 1414.2).abs() < 1e-6);
        assert_eq!(layout.page_count(), 4);
        assert_eq!(
            bounds(&layout),
            vec![(0, 1414), (1414, 2828), (2828, 4243), (4243, 5000)]
        );
    }

    #[test]
    fn exact_multiple_has_no_trailing_band() {
        let layout = PageLayout::compute(500, 3000, 2.0).unwrap();
        assert_eq!(layout.page_count(), 3);
        assert_eq!(bounds(&layout), vec![(0, 1000), (1000, 2000), (2000, 3000)]);
    }

    #[test]
    fn exact_multiple_with_fractional_ratio() {
        // 5000 * 1.4142 lands on 7071 up to float noise
        let layout = PageLayout::compute(5000, 14_142, ISO_216_RATIO).unwrap();
        assert_eq!(layout.page_count(), 2);
        let regions: Vec<_> = layout.regions().collect();
        assert_eq!(regions.last().unwrap().bottom, 14_142);
        assert!(regions.iter().all(|r| r.height() > 0));
    }

    #[test]
    fn image_exactly_one_page_tall() {
        let layout = PageLayout::compute(100, 200, 2.0).unwrap();
        assert_eq!(layout.page_count(), 1);
    }

    #[test]
    fn zero_width_is_invalid() {
        let err = PageLayout::compute(0, 100, ISO_216_RATIO).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension(_)));
    }

    #[test]
    fn zero_height_is_invalid() {
        let err = PageLayout::compute(100, 0, ISO_216_RATIO).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension(_)));
    }

    #[test]
    fn bad_ratios_are_invalid() {
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = PageLayout::compute(100, 100, ratio).unwrap_err();
            assert!(matches!(err, Error::InvalidDimension(_)), "ratio {}", ratio);
        }
    }

    #[test]
    fn sub_pixel_page_is_invalid() {
        let err = PageLayout::compute(2, 100, 0.25).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension(_)));
    }

    #[test]
    fn page_count_matches_ceiling_formula() {
        for width in [1u32, 7, 100, 333, 1024] {
            for height in [1u32, 2, 99, 1000, 4321, 20_000] {
                for ratio in [1.0, ISO_216_RATIO, 1.5, 2.75, 9.0] {
                    let layout = PageLayout::compute(width, height, ratio).unwrap();
                    let expected = (height as f64 / (width as f64 * ratio)).ceil() as u32;
                    assert_eq!(layout.page_count(), expected.max(1));
                    assert!(layout.page_count() >= 1);
                }
            }
        }
    }

    #[test]
    fn bands_cover_image_without_overlap() {
        for (width, height, ratio) in [
            (1000, 5000, ISO_216_RATIO),
            (3, 10, 1.3),
            (1, 17, 1.0),
            (640, 100_000, 1.2941),
        ] {
            let layout = PageLayout::compute(width, height, ratio).unwrap();
            let regions: Vec<_> = layout.regions().collect();
            assert_eq!(regions.len() as u32, layout.page_count());
            assert_eq!(regions[0].top, 0);
            assert_eq!(regions.last().unwrap().bottom, height);
            for pair in regions.windows(2) {
                assert_eq!(pair[0].bottom, pair[1].top);
                assert!(pair[0].top < pair[1].top);
            }
            for r in &regions {
                assert!(r.height() > 0);
                assert_eq!((r.left, r.right), (0, width));
            }
        }
    }

    #[test]
    fn regions_are_recomputable() {
        let layout = PageLayout::compute(777, 12_345, ISO_216_RATIO).unwrap();
        let first: Vec<_> = layout.regions().collect();
        let second: Vec<_> = layout.regions().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn band_region_past_end_is_none() {
        let layout = PageLayout::compute(10, 25, 1.0).unwrap();
        assert_eq!(layout.page_count(), 3);
        assert!(layout.band_region(3).is_none());
    }

    #[test]
    fn progress_ends_at_100() {
        let layout = PageLayout::compute(10, 70, 1.0).unwrap();
        let values: Vec<u8> = (0..layout.page_count())
            .map(|i| layout.progress_after(i))
            .collect();
        assert_eq!(values, vec![14, 29, 43, 57, 71, 86, 100]);
    }

    #[test]
    fn page_size_in_points() {
        let layout = PageLayout::compute(1000, 5000, ISO_216_RATIO).unwrap();
        let size = layout.page_size(PageUnit::default());
        assert_eq!(size.width_pt, 1000.0);
        assert!((size.height_pt - 1414.2).abs() < 0.01);

        let size = layout.page_size(PageUnit { dpi: 144 });
        assert_eq!(size.width_pt, 500.0);
        assert!((size.height_pt - 707.1).abs() < 0.01);
        assert!(!size.exceeds_pdf_limit());
    }

    #[test]
    fn zero_dpi_is_invalid() {
        let err = PageUnit { dpi: 0 }.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidDimension(_)));
        assert!(PageUnit { dpi: 1 }.validate().is_ok());
    }
}
