//! Serialized content-type classification.
//!
//! The classifier is not safe to call concurrently, so every request goes
//! through one worker thread that owns it. Callers send a path and block on
//! a private reply channel; the worker answers strictly in submission order.

use crate::detect::{Classifier, MagicClassifier};
use crate::filter::Filter;
use crate::registry::FilterRegistry;
use crossbeam::channel::{self, Sender};
use extcompress_core::{ContentType, ExtCompressError, Result};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

struct Request {
    path: PathBuf,
    reply: Sender<Result<ContentType>>,
}

/// Single-worker front end for a non-reentrant [`Classifier`].
///
/// The worker runs until [`stop`](Self::stop) is called or the resolver is
/// dropped. The resolver itself is `Sync`; share it by reference.
#[derive(Debug)]
pub struct ContentTypeResolver {
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl ContentTypeResolver {
    /// Start a resolver backed by [`MagicClassifier`].
    pub fn start() -> Result<Self> {
        Self::start_with(|| Ok(MagicClassifier::new()))
    }

    /// Start a resolver whose classifier is built by `init` on the worker
    /// thread.
    ///
    /// An `init` failure is returned here; without a classifier nothing can
    /// be resolved, so callers should treat it as fatal.
    pub fn start_with<C, F>(init: F) -> Result<Self>
    where
        C: Classifier,
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        let (requests, inbox) = channel::unbounded::<Request>();
        let (ready_tx, ready_rx) = channel::bounded::<Result<()>>(1);

        let worker = thread::Builder::new()
            .name("content-type-resolver".to_string())
            .spawn(move || {
                let mut classifier = match init() {
                    Ok(classifier) => {
                        let _ = ready_tx.send(Ok(()));
                        classifier
                    }
                    Err(e) => {
                        error!(error = %e, "Classifier initialization failed");
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for request in inbox.iter() {
                    let outcome = classifier.classify(&request.path);
                    if let Err(e) = &outcome {
                        debug!(path = %request.path.display(), error = %e, "Classification failed");
                    }
                    // The caller may have given up waiting.
                    let _ = request.reply.send(outcome);
                }
                debug!("Content-type resolver stopped");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                requests: Some(requests),
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(ExtCompressError::ResolverStopped)
            }
        }
    }

    /// Classify the file at `path`, blocking until the worker replies.
    pub fn classify(&self, path: impl AsRef<Path>) -> Result<ContentType> {
        let requests = self
            .requests
            .as_ref()
            .ok_or(ExtCompressError::ResolverStopped)?;
        let (reply, response) = channel::bounded(1);
        requests
            .send(Request {
                path: path.as_ref().to_path_buf(),
                reply,
            })
            .map_err(|_| ExtCompressError::ResolverStopped)?;
        response
            .recv()
            .map_err(|_| ExtCompressError::ResolverStopped)?
    }

    /// Classify the file at `path` and resolve its handler in `registry`.
    pub fn handler_for(&self, registry: &FilterRegistry, path: impl AsRef<Path>) -> Result<Filter> {
        let content_type = self.classify(path)?;
        registry.lookup(content_type.as_str())
    }

    /// Check if the worker is still accepting requests.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Stop the worker after it drains queued requests.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Closing the channel ends the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Content-type resolver worker panicked");
            }
        }
    }
}

impl Drop for ContentTypeResolver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
