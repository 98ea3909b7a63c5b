/*!
 * Background pass worker.
 *
 * Each pass runs on a dedicated OS thread with its own single-threaded tokio
 * runtime. The worker owns its inputs and talks to the controller only
 * through the event channel. A pass that returns an error, or whose runtime
 * cannot start, reports exactly one [`PassEvent::Error`].
 */

use log::{debug, error};
use std::future::Future;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::analysis::CancellationFlag;
use crate::errors::AnalysisError;

use super::events::{EventSender, PassEvent};

/// Handle to a running pass
#[derive(Debug)]
pub struct PassWorker {
    name: String,
    handle: Option<JoinHandle<()>>,
    receiver: Receiver<PassEvent>,
    cancel: CancellationFlag,
}

impl PassWorker {
    /// Start `task` on a new thread.
    ///
    /// The task receives the event sender and the cancellation flag; its error,
    /// if any, is turned into the pass's single error event.
    pub fn spawn<F, Fut>(name: &str, cancel: CancellationFlag, task: F) -> Result<Self, AnalysisError>
    where
        F: FnOnce(EventSender, CancellationFlag) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AnalysisError>>,
    {
        let (tx, receiver) = mpsc::channel();
        let sender = EventSender::new(tx);
        let worker_cancel = cancel.clone();
        let thread_name = format!("pass-{}", name);

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start runtime for {}: {}", thread_name, e);
                        sender.send(PassEvent::Error {
                            message: format!("Failed to start pass runtime: {}", e),
                        });
                        return;
                    }
                };

                let result = runtime.block_on(task(sender.clone(), worker_cancel));
                if let Err(e) = result {
                    error!("{} failed: {}", thread_name, e);
                    sender.send(PassEvent::Error { message: e.to_string() });
                }
                debug!("{} finished", thread_name);
            })
            .map_err(|e| AnalysisError::Worker(format!("Failed to spawn {} worker: {}", name, e)))?;

        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            receiver,
            cancel,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request a cooperative stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Events received so far, without blocking
    pub fn try_drain(&self) -> Vec<PassEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the thread to exit and collect its remaining events.
    ///
    /// A panicked worker yields an error event so the pass still ends with
    /// exactly one terminal event.
    pub fn join(mut self) -> Vec<PassEvent> {
        let mut events = Vec::new();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Worker for {} panicked", self.name);
                events.extend(self.try_drain());
                events.push(PassEvent::Error {
                    message: format!("The {} pass stopped unexpectedly", self.name),
                });
                return events;
            }
        }
        events.extend(self.try_drain());
        events
    }
}
