//! Intermediate storage for encoded bands between slicing and export.

use clap::ValueEnum;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::encode::{BandCodec, EncodedBand};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SpoolKind {
    /// keep encoded bands in memory
    #[default]
    Memory,
    /// write encoded bands to a private temporary directory
    Disk,
}

enum Entry {
    Memory(EncodedBand),
    Disk {
        index: u32,
        width: u32,
        height: u32,
        codec: BandCodec,
        path: PathBuf,
    },
}

impl Entry {
    fn load(self) -> Result<EncodedBand> {
        match self {
            Entry::Memory(band) => Ok(band),
            Entry::Disk {
                index,
                width,
                height,
                codec,
                path,
            } => {
                let data = std::fs::read(&path)?;
                // the directory goes away with the spool; this just frees space early
                let _ = std::fs::remove_file(&path);
                Ok(EncodedBand {
                    index,
                    width,
                    height,
                    codec,
                    data,
                })
            }
        }
    }
}

/// Ordered encoded bands. A disk spool owns a directory unique to this
/// conversion, removed when the spool is dropped.
pub struct Spool {
    dir: Option<TempDir>,
    entries: Vec<Entry>,
}

impl Spool {
    pub fn new(kind: SpoolKind, parent: Option<&Path>) -> Result<Self> {
        let dir = match kind {
            SpoolKind::Memory => None,
            SpoolKind::Disk => {
                let mut builder = tempfile::Builder::new();
                builder.prefix("tallpdf-");
                let dir = match parent {
                    Some(parent) => builder.tempdir_in(parent)?,
                    None => builder.tempdir()?,
                };
                tracing::debug!(dir = %dir.path().display(), "spooling bands to disk");
                Some(dir)
            }
        };
        Ok(Spool {
            dir,
            entries: Vec::new(),
        })
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(|d| d.path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, band: EncodedBand) -> Result<()> {
        let entry = match &self.dir {
            None => Entry::Memory(band),
            Some(dir) => {
                let path = dir
                    .path()
                    .join(format!("band_{:04}.{}", band.index + 1, band.codec.extension()));
                std::fs::write(&path, &band.data)?;
                Entry::Disk {
                    index: band.index,
                    width: band.width,
                    height: band.height,
                    codec: band.codec,
                    path,
                }
            }
        };
        self.entries.push(entry);
        Ok(())
    }

    /// Hand the bands out in insertion order.
    pub fn drain(&mut self) -> impl Iterator<Item = Result<EncodedBand>> + '_ {
        self.entries.drain(..).map(Entry::load)
    }
}
