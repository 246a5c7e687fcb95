//! Background execution of a conversion with a progress event stream.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::thread::JoinHandle;

use crate::convert::{convert, ConvertRequest};
use crate::export::Destination;
use crate::progress::{CancelFlag, ProgressSink};

/// Terminal result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// path of the written document, `-` for stdout
    Success(PathBuf),
    Failure(String),
}

/// Updates sent from the worker to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Progress(u8),
    /// always the last event
    Finished(Outcome),
}

struct ChannelProgress(Sender<Event>);

impl ProgressSink for ChannelProgress {
    fn report(&self, percent: u8) {
        // nobody listening is fine
        let _ = self.0.send(Event::Progress(percent));
    }
}

pub struct WorkerHandle {
    events: Receiver<Event>,
    cancel: CancelFlag,
    thread: JoinHandle<Outcome>,
}

/// Run `request` on a dedicated thread.
pub fn spawn(request: ConvertRequest) -> std::io::Result<WorkerHandle> {
    let (tx, rx) = unbounded();
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();

    let thread = std::thread::Builder::new()
        .name("tallpdf-convert".into())
        .spawn(move || {
            let progress = ChannelProgress(tx);
            let outcome = match convert(&request, &progress, &worker_cancel) {
                Ok(report) => Outcome::Success(match report.output {
                    Destination::Path(path) => path,
                    Destination::Stdout => PathBuf::from("-"),
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "conversion failed");
                    Outcome::Failure(e.to_string())
                }
            };
            let _ = progress.0.send(Event::Finished(outcome.clone()));
            outcome
        })?;

    Ok(WorkerHandle {
        events: rx,
        cancel,
        thread,
    })
}

impl WorkerHandle {
    /// Progress events followed by one `Finished`; the channel closes after it.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Ask the worker to stop before its next band.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn join(self) -> Outcome {
        self.thread
            .join()
            .unwrap_or_else(|_| Outcome::Failure("conversion worker panicked".to_string()))
    }
}
