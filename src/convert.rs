//! The end-to-end conversion pipeline for one request.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::encode::{encode_band, BandCodec};
use crate::error::Result;
use crate::export::{export, Destination, ExportSettings};
use crate::geometry::{validate_aspect_ratio, PageLayout, PageSize, PageUnit, ISO_216_RATIO};
use crate::paginate::{LastPage, Paginator};
use crate::progress::{CancelFlag, ProgressSink};
use crate::source::SourceImage;
use crate::spool::{Spool, SpoolKind};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// page height divided by page width
    pub aspect_ratio: f64,
    pub unit: PageUnit,
    pub codec: BandCodec,
    pub spool: SpoolKind,
    /// parent for the disk spool directory; system temp dir when unset
    pub spool_dir: Option<PathBuf>,
    pub last_page: LastPage,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            aspect_ratio: ISO_216_RATIO,
            unit: PageUnit::default(),
            codec: BandCodec::default(),
            spool: SpoolKind::default(),
            spool_dir: None,
            last_page: LastPage::default(),
            title: None,
            author: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: Destination,
    pub options: ConvertOptions,
}

impl ConvertRequest {
    pub fn new(input: impl Into<PathBuf>, output: Destination) -> Self {
        ConvertRequest {
            input: input.into(),
            output,
            options: ConvertOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub output: Destination,
    pub layout: PageLayout,
    pub pages: u32,
    pub page_size: PageSize,
    pub elapsed: Duration,
}

/// Slice `request.input` into pages and write the PDF.
///
/// Runs sequentially on the calling thread. Temporary band storage is
/// released on every return path, including cancellation.
pub fn convert(
    request: &ConvertRequest,
    progress: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<ConvertReport> {
    let opts = &request.options;
    let start = Instant::now();

    // reject bad settings before touching the filesystem
    validate_aspect_ratio(opts.aspect_ratio)?;
    opts.unit.validate()?;

    let source = SourceImage::open(&request.input)?;
    let layout = source.layout(opts.aspect_ratio)?;
    tracing::info!(
        input = %request.input.display(),
        width = layout.source_width(),
        height = layout.source_height(),
        page_height = layout.page_height_px(),
        pages = layout.page_count(),
        "converting"
    );

    let mut spool = Spool::new(opts.spool, opts.spool_dir.as_deref())?;
    let pages = Paginator::new(&source, &layout)
        .last_page(opts.last_page)
        .with_progress(progress)
        .with_cancel(cancel);
    for band in pages {
        let band = band?;
        spool.push(encode_band(&band, opts.codec)?)?;
    }
    // the source is no longer needed once every band is encoded
    drop(source);

    let settings = ExportSettings {
        unit: opts.unit,
        title: opts.title.clone(),
        author: opts.author.clone(),
        ..ExportSettings::default()
    };
    let summary = export(spool.drain(), &layout, &settings, &request.output)?;

    Ok(ConvertReport {
        output: request.output.clone(),
        layout,
        pages: summary.pages,
        page_size: summary.page_size,
        elapsed: start.elapsed(),
    })
}

/// `input` with its extension replaced by `.pdf`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}
