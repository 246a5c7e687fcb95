use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::encode::BandCodec;

/// file format for `slice` output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

/// PNG compression level
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum PngCompression {
    /// fastest encoding, larger files
    #[default]
    Fast,
    /// smaller files, slower encoding
    Small,
}

/// how bands are embedded in the PDF
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CodecKind {
    /// lossy JPEG, small files
    #[default]
    Jpeg,
    /// lossless zlib
    Flate,
}

impl CodecKind {
    pub fn with_quality(self, quality: u8) -> BandCodec {
        match self {
            CodecKind::Jpeg => BandCodec::Jpeg { quality },
            CodecKind::Flate => BandCodec::Flate,
        }
    }
}

/// parse a page aspect ratio (height / width) given as "1.4142" or "297:210"
pub fn parse_aspect_ratio(s: &str) -> Result<f64> {
    let s = s.trim();
    let ratio = if let Some((h, w)) = s.split_once(':') {
        let h: f64 = h.trim().parse().context("Invalid height in ratio")?;
        let w: f64 = w.trim().parse().context("Invalid width in ratio")?;
        anyhow::ensure!(w != 0.0, "Ratio width must not be zero");
        h / w
    } else {
        s.parse().context("Invalid aspect ratio")?
    };
    anyhow::ensure!(
        ratio.is_finite() && ratio > 0.0,
        "Aspect ratio must be a positive number, got {}",
        s
    );
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_decimal() {
        assert_eq!(parse_aspect_ratio("1.4142").unwrap(), 1.4142);
    }

    #[test]
    fn ratio_colon() {
        let r = parse_aspect_ratio("297:210").unwrap();
        assert!((r - 1.414_285_7).abs() < 1e-6);
    }

    #[test]
    fn ratio_whitespace() {
        assert_eq!(parse_aspect_ratio(" 4 : 2 ").unwrap(), 2.0);
    }

    #[test]
    fn ratio_err_zero() {
        assert!(parse_aspect_ratio("0").is_err());
    }

    #[test]
    fn ratio_err_negative() {
        assert!(parse_aspect_ratio("-1.5").is_err());
    }

    #[test]
    fn ratio_err_zero_width() {
        assert!(parse_aspect_ratio("3:0").is_err());
    }

    #[test]
    fn ratio_err_garbage() {
        assert!(parse_aspect_ratio("tall").is_err());
        assert!(parse_aspect_ratio("nan").is_err());
    }

    #[test]
    fn codec_quality_applies_to_jpeg_only() {
        assert_eq!(CodecKind::Jpeg.with_quality(90), BandCodec::Jpeg { quality: 90 });
        assert_eq!(CodecKind::Flate.with_quality(90), BandCodec::Flate);
    }
}
