//! Slice a tall raster image into fixed-aspect-ratio PDF pages.
//!
//! The image keeps its width; it is cut into horizontal bands each one page
//! tall (`width × aspect_ratio` pixels) and every band becomes one full-bleed
//! PDF page.
//!
//! ```no_run
//! use tallpdf::{convert, CancelFlag, ConvertRequest, Destination, NoProgress};
//!
//! fn main() -> tallpdf::Result<()> {
//!     let request = ConvertRequest::new("scroll.png", Destination::Path("scroll.pdf".into()));
//!     let report = convert(&request, &NoProgress, &CancelFlag::new())?;
//!     println!("{} pages", report.pages);
//!     Ok(())
//! }
//! ```

pub mod convert;
pub mod encode;
pub mod error;
pub mod export;
pub mod geometry;
pub mod logger;
pub mod paginate;
pub mod parse;
pub mod progress;
pub mod slice;
pub mod source;
pub mod spool;
pub mod worker;

pub use convert::{convert, default_output_path, ConvertOptions, ConvertReport, ConvertRequest};
pub use encode::{encode_band, BandCodec, EncodedBand};
pub use error::{Error, Result};
pub use export::{export, Destination, ExportSettings, ExportSummary};
pub use geometry::{BandRegion, PageLayout, PageSize, PageUnit, ISO_216_RATIO};
pub use paginate::{ColorMode, LastPage, PageBand, Paginator};
pub use progress::{CancelFlag, NoProgress, ProgressSink};
pub use source::{probe_dimensions, SourceImage};
pub use spool::{Spool, SpoolKind};
pub use worker::{Event, Outcome, WorkerHandle};
