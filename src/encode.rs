use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::io::Write;

use crate::error::{Error, Result};
use crate::paginate::PageBand;

/// JPEG's SOF header stores dimensions as u16
const JPEG_MAX_EDGE: u32 = u16::MAX as u32;

/// How a band's pixels are stored inside the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandCodec {
    /// lossy, embedded as-is with DCTDecode
    Jpeg { quality: u8 },
    /// lossless zlib, embedded with FlateDecode
    Flate,
}

impl Default for BandCodec {
    fn default() -> Self {
        BandCodec::Jpeg { quality: 75 }
    }
}

impl BandCodec {
    pub fn pdf_filter(self) -> &'static [u8] {
        match self {
            BandCodec::Jpeg { .. } => b"DCTDecode",
            BandCodec::Flate => b"FlateDecode",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            BandCodec::Jpeg { .. } => "jpg",
            BandCodec::Flate => "zlib",
        }
    }
}

/// A band compressed and ready to become a PDF image XObject.
#[derive(Debug, Clone)]
pub struct EncodedBand {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub codec: BandCodec,
    pub data: Vec<u8>,
}

pub fn encode_band(band: &PageBand, codec: BandCodec) -> Result<EncodedBand> {
    let index = band.region.index;
    let pixels = &band.pixels;
    let data = match codec {
        BandCodec::Jpeg { quality } => {
            if pixels.width() > JPEG_MAX_EDGE || pixels.height() > JPEG_MAX_EDGE {
                return Err(Error::encoding(
                    index,
                    format!(
                        "{}x{} exceeds the JPEG limit of {} pixels per edge, use flate",
                        pixels.width(),
                        pixels.height(),
                        JPEG_MAX_EDGE
                    ),
                ));
            }
            let mut out = Vec::with_capacity(pixels.as_raw().len() / 8);
            encode_jpeg(pixels, quality, &mut out).map_err(|e| Error::encoding(index, e))?;
            out
        }
        BandCodec::Flate => encode_flate(pixels).map_err(|e| Error::encoding(index, e))?,
    };
    Ok(EncodedBand {
        index,
        width: pixels.width(),
        height: pixels.height(),
        codec,
        data,
    })
}

pub fn encode_jpeg(pixels: &RgbImage, quality: u8, writer: impl Write) -> image::ImageResult<()> {
    let mut writer = std::io::BufWriter::new(writer);
    JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100)).encode_image(pixels)?;
    writer.flush()?;
    Ok(())
}

fn encode_flate(pixels: &RgbImage) -> std::io::Result<Vec<u8>> {
    let raw = pixels.as_raw();
    let mut enc = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::fast());
    // row by row for better cache locality
    let row_bytes = pixels.width() as usize * 3;
    for row in raw.chunks(row_bytes.max(1)) {
        enc.write_all(row)?;
    }
    enc.finish()
}
