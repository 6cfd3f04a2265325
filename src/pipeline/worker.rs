//! Background batch execution.
//!
//! A batch runs on its own named thread and streams [`BatchEvent`]s back over
//! an unbounded channel, so a slow consumer never stalls the conversion.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{BatchConverter, BatchReport, BatchRequest, PipelineError};
use crate::progress::ProgressReporter;

/// Messages sent from the batch worker
#[derive(Debug)]
pub enum BatchEvent {
    /// A progress step finished
    Progress {
        /// Percentage of the batch complete, 0-100
        percent: u8,
        /// Status line
        message: String,
    },
    /// The batch ended; this is always the last event
    Finished(Result<BatchReport, PipelineError>),
}

/// Forwards progress updates into a channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<BatchEvent>,
}

impl ChannelReporter {
    /// Create a reporter sending on `sender`
    pub fn new(sender: Sender<BatchEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, percent: u8, message: &str) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.sender.send(BatchEvent::Progress {
            percent,
            message: message.to_string(),
        });
    }
}

/// Handle to a batch running on a worker thread
#[derive(Debug)]
pub struct BatchHandle {
    events: Receiver<BatchEvent>,
    handle: JoinHandle<()>,
}

impl BatchHandle {
    /// Event stream of the batch
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    /// Block until the batch ends, discarding progress events.
    pub fn wait(self) -> Result<BatchReport, PipelineError> {
        self.wait_with(|_, _| {})
    }

    /// Block until the batch ends, passing each progress event to `on_progress`.
    pub fn wait_with<F>(self, mut on_progress: F) -> Result<BatchReport, PipelineError>
    where
        F: FnMut(u8, &str),
    {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                BatchEvent::Progress { percent, message } => on_progress(percent, &message),
                BatchEvent::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }

        if self.handle.join().is_err() {
            return Err(PipelineError::WorkerLost);
        }
        outcome.unwrap_or(Err(PipelineError::WorkerLost))
    }
}

/// Run `request` on a new worker thread.
pub fn spawn_batch(
    converter: BatchConverter,
    request: BatchRequest,
) -> Result<BatchHandle, PipelineError> {
    let (sender, events) = unbounded();

    let handle = thread::Builder::new()
        .name("msv-batch".to_string())
        .spawn(move || {
            let reporter = ChannelReporter::new(sender.clone());
            let result = converter.run(&request, &reporter);
            let _ = sender.send(BatchEvent::Finished(result));
        })
        .map_err(PipelineError::Spawn)?;

    Ok(BatchHandle { events, handle })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_reporter_forwards_progress() {
        let (sender, receiver) = unbounded();
        let reporter = ChannelReporter::new(sender);
        reporter.report(40, "Processing: a.msv");

        match receiver.try_recv().unwrap() {
            BatchEvent::Progress { percent, message } => {
                assert_eq!(percent, 40);
                assert_eq!(message, "Processing: a.msv");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_reporter_survives_dropped_receiver() {
        let (sender, receiver) = unbounded();
        drop(receiver);
        ChannelReporter::new(sender).report(10, "ignored");
    }

    #[test]
    fn test_failed_batch_finishes_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let request = BatchRequest::new(
            dir.path().join("missing.zip"),
            dir.path().join("root"),
            "converter",
        );
        let handle = spawn_batch(BatchConverter::default(), request).unwrap();
        let err = handle.wait().unwrap_err();
        assert!(matches!(err, PipelineError::Staging(_)));
    }
}
