//! PDF assembly: one full-bleed image per page.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::encode::EncodedBand;
use crate::error::{Error, Result};
use crate::geometry::{PageLayout, PageSize, PageUnit};
use crate::paginate::ColorMode;

/// Where the finished document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Path(PathBuf),
    Stdout,
}

impl Destination {
    /// `-` selects stdout
    pub fn from_arg(path: &Path) -> Self {
        if path == Path::new("-") {
            Destination::Stdout
        } else {
            Destination::Path(path.to_path_buf())
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Destination::Path(p) => Some(p),
            Destination::Stdout => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Path(p) => write!(f, "{}", p.display()),
            Destination::Stdout => f.write_str("<stdout>"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub unit: PageUnit,
    pub title: Option<String>,
    pub author: Option<String>,
    /// compress content streams and other uncompressed objects
    pub compress: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            unit: PageUnit::default(),
            title: None,
            author: None,
            compress: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExportSummary {
    pub pages: u32,
    pub page_size: PageSize,
}

/// Assemble `bands` into a PDF and write it to `destination`.
///
/// File destinations are written to a temporary sibling and renamed into
/// place, so a failed export never leaves a partial document behind.
pub fn export<I>(
    bands: I,
    layout: &PageLayout,
    settings: &ExportSettings,
    destination: &Destination,
) -> Result<ExportSummary>
where
    I: IntoIterator<Item = Result<EncodedBand>>,
{
    settings.unit.validate()?;
    let page_size = layout.page_size(settings.unit);
    if page_size.exceeds_pdf_limit() {
        tracing::warn!(
            width_pt = page_size.width_pt,
            height_pt = page_size.height_pt,
            "page exceeds the 14400pt PDF limit, some viewers will clamp it; raise --dpi"
        );
    }

    let mut doc = build_document(bands, page_size, settings)?;
    let pages = doc.get_pages().len() as u32;
    if settings.compress {
        doc.compress();
    }
    write_document(&mut doc, destination)?;

    tracing::info!(pages, destination = %destination, "wrote document");
    Ok(ExportSummary { pages, page_size })
}

fn build_document<I>(bands: I, page_size: PageSize, settings: &ExportSettings) -> Result<Document>
where
    I: IntoIterator<Item = Result<EncodedBand>>,
{
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids: Vec<Object> = Vec::new();

    for band in bands {
        let band = band?;
        let page_id = add_band_page(&mut doc, pages_id, band, page_size)?;
        page_ids.push(page_id.into());
    }

    if page_ids.is_empty() {
        return Err(Error::EmptyDocument);
    }

    // build pages tree
    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => page_ids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(info_dictionary(settings));
    doc.trailer.set("Info", info_id);

    Ok(doc)
}

fn add_band_page(
    doc: &mut Document,
    pages_id: ObjectId,
    band: EncodedBand,
    page_size: PageSize,
) -> Result<ObjectId> {
    let mode = ColorMode::Rgb8;
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => Object::Name(b"XObject".to_vec()),
            "Subtype" => Object::Name(b"Image".to_vec()),
            "Width" => band.width as i64,
            "Height" => band.height as i64,
            "ColorSpace" => Object::Name(mode.pdf_color_space().to_vec()),
            "BitsPerComponent" => 8,
            "Filter" => Object::Name(band.codec.pdf_filter().to_vec()),
        },
        band.data,
    ));

    // unit square scaled to the whole page: stretches away any rounding
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_size.width_pt),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page_size.height_pt),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| Error::Export(format!("failed to encode content stream: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im0" => image_id,
        },
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Page".to_vec()),
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            Object::Real(page_size.width_pt),
            Object::Real(page_size.height_pt),
        ],
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    tracing::debug!(band = band.index, "added page");
    Ok(page_id)
}

fn info_dictionary(settings: &ExportSettings) -> lopdf::Dictionary {
    let literal = |s: &str| Object::String(s.as_bytes().to_vec(), StringFormat::Literal);

    let mut info = lopdf::Dictionary::new();
    info.set(
        "Producer",
        literal(&format!("tallpdf {}", env!("CARGO_PKG_VERSION"))),
    );
    // PDF date format: D:YYYYMMDDHHmmSSZ
    let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    info.set("CreationDate", literal(&created));
    if let Some(title) = &settings.title {
        info.set("Title", literal(title));
    }
    if let Some(author) = &settings.author {
        info.set("Author", literal(author));
    }
    info
}

fn write_document(doc: &mut Document, destination: &Destination) -> Result<()> {
    match destination {
        Destination::Stdout => {
            let stdout = std::io::stdout();
            let mut out = std::io::BufWriter::new(stdout.lock());
            doc.save_to(&mut out)
                .map_err(|e| Error::Export(format!("failed to write PDF to stdout: {}", e)))?;
            out.flush()
                .map_err(|e| Error::Export(format!("failed to write PDF to stdout: {}", e)))?;
        }
        Destination::Path(path) => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut builder = tempfile::Builder::new();
            builder.prefix(".tallpdf-").suffix(".part");
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                builder.permissions(std::fs::Permissions::from_mode(0o644));
            }
            let mut tmp = builder.tempfile_in(dir).map_err(|e| {
                Error::Export(format!("cannot write to {}: {}", dir.display(), e))
            })?;

            {
                let mut out = std::io::BufWriter::new(tmp.as_file_mut());
                doc.save_to(&mut out)
                    .map_err(|e| Error::Export(format!("failed to write PDF: {}", e)))?;
                out.flush()
                    .map_err(|e| Error::Export(format!("failed to write PDF: {}", e)))?;
            }
            tmp.persist(path).map_err(|e| {
                Error::Export(format!("failed to save {}: {}", path.display(), e.error))
            })?;
        }
    }
    Ok(())
}
