//! Preview request scheduler
//!
//! Callers talk to a [`PreviewScheduler`] handle from any thread. Cache hits
//! are answered from the shared [`ResultCache`]; everything else becomes a
//! command for the control thread, which owns the single-flight queue and
//! the table of requests still waiting on the decoder. All result handlers
//! run on that control thread, one at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::cache::ResultCache;
use super::decoder::{DecodeEvent, FrameDecoder, FrameSink, SessionId, VideoSource};
use super::error::PreviewError;
use super::key::CacheKey;
use super::queue::{Aborted, Cancelled, Enqueued, VideoQueue, VideoTask};
use super::sampling::sample_timestamps;
use super::types::{
    AssetHandle, Frame, MediaKind, Preview, PreviewResult, RequestId, RequestOptions,
    ResultHandler, TargetSize,
};
use super::worker::WorkerPool;
use crate::config::Config;

/// Messages processed by the control thread.
enum Command {
    /// Hand a cached result to a caller.
    Deliver {
        handler: ResultHandler,
        result: PreviewResult,
    },
    Request(Request),
    Cancel(RequestId),
    StillDecoded {
        id: RequestId,
        result: Result<Frame, PreviewError>,
    },
    VideoOpened {
        id: RequestId,
        result: Result<VideoSource, PreviewError>,
    },
    DegradedDecoded {
        id: RequestId,
        key: CacheKey,
        result: Result<Frame, PreviewError>,
    },
    Session {
        session: SessionId,
        event: DecodeEvent,
    },
    Shutdown,
}

/// A cache miss on its way to the control thread.
struct Request {
    id: RequestId,
    key: CacheKey,
    asset: AssetHandle,
    size: TargetSize,
    options: RequestOptions,
    handler: ResultHandler,
}

/// Point-in-time counters published by the control thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Video tasks waiting for the processing slot
    pub waiting: usize,
    /// Whether a video task holds the processing slot
    pub processing: bool,
    /// Requests waiting on a still decode or on opening a video
    pub pending: usize,
    /// Multi-frame sessions started since creation
    pub sessions_started: usize,
    /// Entries in the result cache
    pub cached: usize,
}

#[derive(Default)]
struct SharedStats {
    waiting: AtomicUsize,
    processing: AtomicBool,
    pending: AtomicUsize,
    sessions_started: AtomicUsize,
}

struct Shared {
    cache: ResultCache,
    commands: Sender<Command>,
    stats: Arc<SharedStats>,
    control: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn stop(&self) {
        let _ = self.commands.send(Command::Shutdown);
        let handle = self
            .control
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            // Stopping from inside a result handler must not join itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Schedules preview generation and answers repeated requests from cache.
///
/// Cloning yields another handle to the same scheduler. The control thread
/// stops when the last handle is dropped or [`shutdown`](Self::shutdown) is
/// called; handlers that capture a handle keep it alive until then.
#[derive(Clone)]
pub struct PreviewScheduler {
    shared: Arc<Shared>,
}

impl PreviewScheduler {
    /// Start a scheduler driving `decoder`.
    pub fn new(decoder: Arc<dyn FrameDecoder>, config: &Config) -> Self {
        let cache = ResultCache::new(config.cache.capacity);
        let (commands, command_rx) = channel::<Command>();
        let stats = Arc::new(SharedStats::default());

        let control = ControlLoop {
            decoder,
            cache: cache.clone(),
            queue: VideoQueue::new(),
            pool: WorkerPool::new(config.scheduler.worker_threads),
            commands: commands.clone(),
            pending: HashMap::new(),
            degraded: HashMap::new(),
            degraded_offset: config.scheduler.degraded_offset(),
            report_failures: config.scheduler.report_failures,
            next_session: 1,
            stats: Arc::clone(&stats),
        };
        let handle = thread::spawn(move || control.run(command_rx));

        Self {
            shared: Arc::new(Shared {
                cache,
                commands,
                stats,
                control: Mutex::new(Some(handle)),
            }),
        }
    }

    /// Start a scheduler with the default configuration.
    pub fn with_defaults(decoder: Arc<dyn FrameDecoder>) -> Self {
        Self::new(decoder, &Config::default())
    }

    /// Request a preview of `asset` at `size`.
    ///
    /// Never blocks on decoding. On a cache hit the cached result is handed to
    /// `handler` on the control thread and `None` is returned, as there is
    /// nothing to cancel. Otherwise the returned id identifies the request for
    /// [`cancel_request`](Self::cancel_request).
    pub fn request_preview(
        &self,
        asset: &AssetHandle,
        size: TargetSize,
        options: &RequestOptions,
        handler: impl Fn(PreviewResult) + Send + Sync + 'static,
    ) -> Option<RequestId> {
        let key = CacheKey::new(asset, size, options);
        let handler: ResultHandler = Arc::new(handler);

        if let Some(result) = self.shared.cache.get(&key) {
            trace!(key = %key, "Preview served from cache");
            self.send(Command::Deliver { handler, result });
            return None;
        }

        let id = RequestId::generate();
        debug!(request = %id, key = %key, kind = ?asset.kind(), "Preview requested");
        self.send(Command::Request(Request {
            id: id.clone(),
            key,
            asset: asset.clone(),
            size,
            options: options.clone(),
            handler,
        }));
        Some(id)
    }

    /// Stop delivering results for a request and abandon its decoding.
    ///
    /// Best-effort: results already on their way may still arrive. Unknown
    /// or finished ids are ignored.
    pub fn cancel_request(&self, id: &RequestId) {
        self.send(Command::Cancel(id.clone()));
    }

    /// The cache shared by every handle of this scheduler.
    pub fn cache(&self) -> &ResultCache {
        &self.shared.cache
    }

    /// Snapshot of the counters the control thread publishes after each command.
    pub fn stats(&self) -> SchedulerStats {
        let stats = &self.shared.stats;
        SchedulerStats {
            waiting: stats.waiting.load(Ordering::SeqCst),
            processing: stats.processing.load(Ordering::SeqCst),
            pending: stats.pending.load(Ordering::SeqCst),
            sessions_started: stats.sessions_started.load(Ordering::SeqCst),
            cached: self.shared.cache.len(),
        }
    }

    /// Cancel outstanding work and stop the control thread.
    ///
    /// Later requests are accepted but never answered.
    pub fn shutdown(&self) {
        self.shared.stop();
    }

    fn send(&self, command: Command) {
        // Ignore send errors (control thread may have stopped)
        let _ = self.shared.commands.send(command);
    }
}

/// A request whose still or video source is still being fetched.
struct Pending {
    key: CacheKey,
    size: TargetSize,
    options: RequestOptions,
    handler: ResultHandler,
}

/// State owned by the control thread.
struct ControlLoop {
    decoder: Arc<dyn FrameDecoder>,
    cache: ResultCache,
    queue: VideoQueue,
    pool: WorkerPool,
    /// Sender for worker jobs and decode sessions to report back on
    commands: Sender<Command>,
    pending: HashMap<RequestId, Pending>,
    /// Degraded placeholders in flight, by request
    degraded: HashMap<RequestId, ResultHandler>,
    degraded_offset: Duration,
    report_failures: bool,
    next_session: u64,
    stats: Arc<SharedStats>,
}

impl ControlLoop {
    fn run(mut self, commands: Receiver<Command>) {
        while let Ok(command) = commands.recv() {
            match command {
                Command::Deliver { handler, result } => handler(result),
                Command::Request(request) => self.on_request(request),
                Command::Cancel(id) => self.on_cancel(&id),
                Command::StillDecoded { id, result } => self.on_still(id, result),
                Command::VideoOpened { id, result } => self.on_video_opened(id, result),
                Command::DegradedDecoded { id, key, result } => self.on_degraded(id, key, result),
                Command::Session { session, event } => self.on_session_event(session, event),
                Command::Shutdown => break,
            }
            self.publish_stats();
        }
        self.stop();
    }

    fn on_request(&mut self, request: Request) {
        // The cache may have been filled since the caller checked it
        if let Some(cached) = self.cache.get(&request.key) {
            (request.handler)(PreviewResult::new(request.id, cached.preview));
            return;
        }

        let Request {
            id,
            key,
            asset,
            size,
            options,
            handler,
        } = request;
        let decoder = Arc::clone(&self.decoder);
        let reply = self.commands.clone();
        let allow_network = options.allow_network_fetch;

        match asset.kind() {
            MediaKind::Image => {
                let job_id = id.clone();
                self.pool.submit(move || {
                    let result = decoder.decode_still(&asset, size, allow_network);
                    let _ = reply.send(Command::StillDecoded { id: job_id, result });
                });
            }
            MediaKind::Video => {
                let job_id = id.clone();
                self.pool.submit(move || {
                    let result = decoder.open_video(&asset, allow_network);
                    let _ = reply.send(Command::VideoOpened { id: job_id, result });
                });
            }
        }

        self.pending.insert(
            id,
            Pending {
                key,
                size,
                options,
                handler,
            },
        );
    }

    fn on_still(&mut self, id: RequestId, result: Result<Frame, PreviewError>) {
        let Some(pending) = self.pending.remove(&id) else {
            trace!(request = %id, "Dropping still for cancelled request");
            return;
        };

        match result {
            Ok(image) => {
                let result = PreviewResult::new(
                    id,
                    Preview::Image {
                        image,
                        degraded: false,
                    },
                );
                self.cache.put(pending.key, result.clone());
                (pending.handler)(result);
            }
            Err(error) => {
                warn!(request = %id, key = %pending.key, error = %error, "Still decode failed");
                self.report_failure(&pending.handler, id, error);
            }
        }
    }

    fn on_video_opened(&mut self, id: RequestId, result: Result<VideoSource, PreviewError>) {
        let Some(pending) = self.pending.remove(&id) else {
            trace!(request = %id, "Dropping video source for cancelled request");
            return;
        };

        let source = match result {
            Ok(source) => source,
            Err(error) => {
                warn!(request = %id, key = %pending.key, error = %error, "Could not open video");
                self.report_failure(&pending.handler, id, error);
                return;
            }
        };

        // Another request may have completed the same preview meanwhile
        if let Some(cached) = self.cache.get(&pending.key) {
            (pending.handler)(PreviewResult::new(id, cached.preview));
            return;
        }

        if pending.options.want_degraded_first {
            self.start_degraded(&id, &pending, &source);
        }

        let timestamps = sample_timestamps(
            source.duration(),
            pending.options.frame_interval(),
            pending.options.coverage_fraction(),
        );
        let task = VideoTask::new(
            id.clone(),
            pending.key,
            source,
            pending.size,
            pending.options,
            timestamps,
            pending.handler,
        );

        match self.queue.enqueue(task) {
            Enqueued::Queued { position } => {
                debug!(request = %id, position, "Video preview queued");
            }
            Enqueued::Replaced { previous } => {
                debug!(request = %id, previous = %previous, "Replaced waiting video preview");
                self.degraded.remove(&previous);
            }
            Enqueued::Attached { previous } => {
                debug!(request = %id, previous = %previous, "Attached to processing video preview");
                self.degraded.remove(&previous);
            }
        }
        self.start_next();
    }

    /// Decode the placeholder frame outside the single-flight queue.
    fn start_degraded(&mut self, id: &RequestId, pending: &Pending, source: &VideoSource) {
        let key = pending.key.degraded();
        if let Some(cached) = self.cache.get(&key) {
            (pending.handler)(PreviewResult::new(id.clone(), cached.preview));
            return;
        }

        self.degraded.insert(id.clone(), pending.handler.clone());
        let timestamp = self.degraded_timestamp(source.duration());
        let decoder = Arc::clone(&self.decoder);
        let reply = self.commands.clone();
        let source = source.clone();
        let size = pending.size;
        let id = id.clone();
        self.pool.submit(move || {
            let result = decoder.frame_at(&source, size, timestamp);
            let _ = reply.send(Command::DegradedDecoded { id, key, result });
        });
    }

    /// Early sample point that skips the often blank first frame.
    fn degraded_timestamp(&self, duration: Duration) -> f64 {
        if duration.is_zero() {
            return 0.0;
        }
        self.degraded_offset.min(duration / 2).as_secs_f64()
    }

    fn on_degraded(&mut self, id: RequestId, key: CacheKey, result: Result<Frame, PreviewError>) {
        let handler = self.degraded.remove(&id);
        match result {
            Ok(image) => {
                let result = PreviewResult::new(
                    id,
                    Preview::Image {
                        image,
                        degraded: true,
                    },
                );
                self.cache.put(key, result.clone());
                if let Some(handler) = handler {
                    handler(result);
                }
            }
            Err(error) => {
                debug!(request = %id, error = %error, "Degraded preview unavailable");
            }
        }
    }

    /// Give the free processing slot to the oldest waiting task.
    fn start_next(&mut self) {
        let session = SessionId(self.next_session);
        let Some(task) = self.queue.start_next(session) else {
            return;
        };
        self.next_session += 1;
        self.stats.sessions_started.fetch_add(1, Ordering::SeqCst);

        debug!(
            request = %task.id,
            %session,
            frames = task.timestamps.len(),
            "Starting video preview session"
        );
        let reply = self.commands.clone();
        let sink = FrameSink::new(session, move |session, event| {
            let _ = reply.send(Command::Session { session, event });
        });
        self.decoder
            .generate_frames(&task.source, task.size, &task.timestamps, sink);
    }

    fn on_session_event(&mut self, session: SessionId, event: DecodeEvent) {
        match event {
            DecodeEvent::Frame { timestamp, frame } => {
                let Some(accepted) = self.queue.record_frame(session, timestamp, frame) else {
                    trace!(%session, timestamp, "Dropping frame from stale session");
                    return;
                };
                if let Some(progress) = accepted.progress {
                    progress.deliver();
                }
                if let Some(completed) = accepted.completed {
                    let result = &completed.delivery.result;
                    debug!(request = %result.request_id, key = %completed.key, "Video preview complete");
                    self.degraded.remove(&result.request_id);
                    self.cache.put(completed.key, result.clone());
                    completed.delivery.deliver();
                    self.start_next();
                } else if accepted.drained {
                    debug!(%session, "Cancelled session delivered its last frame");
                    self.start_next();
                }
            }
            DecodeEvent::Failed(error) => match self.queue.abort(session) {
                Some(Aborted::Running(task)) => {
                    self.decoder.cancel_session(session);
                    warn!(request = %task.id, key = %task.key, error = %error, "Video preview failed");
                    self.report_failure(&task.handler, task.id, error);
                    self.start_next();
                }
                Some(Aborted::Cancelled) => {
                    debug!(%session, error = %error, "Cancelled session ended with an error");
                    self.start_next();
                }
                None => {}
            },
            DecodeEvent::Cancelled => match self.queue.abort(session) {
                Some(Aborted::Running(task)) => {
                    debug!(request = %task.id, %session, "Decoder abandoned session");
                    self.start_next();
                }
                Some(Aborted::Cancelled) => {
                    debug!(%session, "Cancelled session wound down");
                    self.start_next();
                }
                None => {}
            },
        }
    }

    fn on_cancel(&mut self, id: &RequestId) {
        let was_pending = self.pending.remove(id).is_some();
        self.degraded.remove(id);

        match self.queue.cancel(id) {
            Some(Cancelled::Processing(session)) => {
                // The slot is released once the session reports its end
                debug!(request = %id, %session, "Cancelling processing video preview");
                self.decoder.cancel_session(session);
            }
            Some(Cancelled::Waiting(_)) => {
                debug!(request = %id, "Removed waiting video preview");
            }
            None if was_pending => {
                debug!(request = %id, "Cancelled request before decoding started");
            }
            None => trace!(request = %id, "Cancel for unknown request"),
        }
    }

    fn report_failure(&self, handler: &ResultHandler, id: RequestId, error: PreviewError) {
        if self.report_failures {
            handler(PreviewResult::new(id, Preview::Failed { error }));
        }
    }

    fn publish_stats(&self) {
        self.stats
            .waiting
            .store(self.queue.waiting_len(), Ordering::SeqCst);
        self.stats
            .processing
            .store(self.queue.is_busy(), Ordering::SeqCst);
        self.stats
            .pending
            .store(self.pending.len(), Ordering::SeqCst);
    }

    fn stop(&mut self) {
        if let Some(session) = self.queue.clear() {
            self.decoder.cancel_session(session);
        }
        self.pending.clear();
        self.degraded.clear();
        self.publish_stats();
        debug!("Preview scheduler stopped");
    }
}
