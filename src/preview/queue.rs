//! Single-flight queue of multi-frame video previews
//!
//! At most one task holds the processing slot; everything else waits in
//! FIFO order. A cancelled task keeps the slot until its session winds down,
//! so two sessions never decode at once. The queue is a plain state machine:
//! the scheduler's control thread owns it and performs the decoder calls it
//! asks for.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use super::decoder::{SessionId, VideoSource};
use super::key::CacheKey;
use super::types::{
    Frame, Preview, PreviewResult, RequestId, RequestOptions, ResultHandler, TargetSize,
};

/// One queued multi-frame preview.
pub(crate) struct VideoTask {
    pub id: RequestId,
    pub key: CacheKey,
    pub source: VideoSource,
    pub size: TargetSize,
    pub options: RequestOptions,
    pub timestamps: Vec<f64>,
    pub handler: ResultHandler,
    /// Frames in completion order
    frames: Vec<(f64, Frame)>,
    /// Frames reported by the session, kept or not
    received: usize,
}

impl VideoTask {
    pub fn new(
        id: RequestId,
        key: CacheKey,
        source: VideoSource,
        size: TargetSize,
        options: RequestOptions,
        timestamps: Vec<f64>,
        handler: ResultHandler,
    ) -> Self {
        Self {
            id,
            key,
            source,
            size,
            options,
            frames: Vec::with_capacity(timestamps.len()),
            received: 0,
            timestamps,
            handler,
        }
    }

    fn is_complete(&self) -> bool {
        self.received >= self.timestamps.len()
    }

    /// Frames sorted by timestamp; completion order is irrelevant.
    fn into_animation(mut self) -> Completed {
        self.frames.sort_by(|a, b| a.0.total_cmp(&b.0));
        let frames: Vec<Frame> = self.frames.into_iter().map(|(_, frame)| frame).collect();
        Completed {
            key: self.key,
            delivery: Delivery {
                handler: self.handler,
                result: PreviewResult::new(
                    self.id,
                    Preview::AnimationFrames {
                        frames: frames.into(),
                    },
                ),
            },
        }
    }

    /// Take over the caller of `newer`, keeping any decoded frames.
    fn adopt_caller(&mut self, newer: VideoTask) -> RequestId {
        let previous = std::mem::replace(&mut self.id, newer.id);
        self.options = newer.options;
        self.handler = newer.handler;
        previous
    }
}

impl fmt::Debug for VideoTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoTask")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("timestamps", &self.timestamps.len())
            .field("frames", &self.frames.len())
            .finish_non_exhaustive()
    }
}

/// A result ready to hand to a caller.
pub(crate) struct Delivery {
    pub handler: ResultHandler,
    pub result: PreviewResult,
}

impl Delivery {
    pub fn deliver(self) {
        (self.handler)(self.result);
    }
}

/// Final animation of a finished task.
pub(crate) struct Completed {
    pub key: CacheKey,
    pub delivery: Delivery,
}

/// What happened to a task handed to [`VideoQueue::enqueue`].
#[derive(Debug, PartialEq)]
pub(crate) enum Enqueued {
    /// Appended at the given waiting position.
    Queued { position: usize },
    /// Replaced a waiting task with the same key.
    Replaced { previous: RequestId },
    /// Attached to the processing task with the same key.
    Attached { previous: RequestId },
}

/// Outcome of a decoded frame for the processing session.
pub(crate) struct FrameAccepted {
    pub progress: Option<Delivery>,
    pub completed: Option<Completed>,
    /// The last frame of a cancelled session arrived and the slot is free.
    pub drained: bool,
}

/// A task removed by [`VideoQueue::cancel`].
#[derive(Debug)]
pub(crate) enum Cancelled {
    Waiting(VideoTask),
    /// The session must be stopped; the slot stays taken until it ends.
    Processing(SessionId),
}

/// The processing task released by [`VideoQueue::abort`].
#[derive(Debug)]
pub(crate) enum Aborted {
    Running(VideoTask),
    /// A task whose caller had already cancelled it.
    Cancelled,
}

struct Processing {
    session: SessionId,
    task: VideoTask,
    cancelled: bool,
}

/// FIFO waiting list plus a single processing slot.
#[derive(Default)]
pub(crate) struct VideoQueue {
    waiting: VecDeque<VideoTask>,
    processing: Option<Processing>,
}

impl VideoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task, deduplicating by cache key.
    ///
    /// The newest caller always wins: a waiting task with the same key is
    /// replaced in place, and a processing task with the same key is
    /// re-pointed at the new caller so it receives the remaining results.
    pub fn enqueue(&mut self, task: VideoTask) -> Enqueued {
        if let Some(processing) = self
            .processing
            .as_mut()
            .filter(|p| !p.cancelled && p.task.key == task.key)
        {
            let previous = processing.task.adopt_caller(task);
            return Enqueued::Attached { previous };
        }

        if let Some(slot) = self.waiting.iter_mut().find(|t| t.key == task.key) {
            let previous = std::mem::replace(slot, task);
            return Enqueued::Replaced {
                previous: previous.id,
            };
        }

        self.waiting.push_back(task);
        Enqueued::Queued {
            position: self.waiting.len() - 1,
        }
    }

    /// Move the oldest waiting task into the free processing slot.
    ///
    /// Returns `None` while another task is processing, a cancelled session
    /// is still winding down, or nothing waits.
    pub fn start_next(&mut self, session: SessionId) -> Option<&VideoTask> {
        if self.processing.is_some() {
            return None;
        }
        let task = self.waiting.pop_front()?;
        let processing = self.processing.insert(Processing {
            session,
            task,
            cancelled: false,
        });
        Some(&processing.task)
    }

    /// Record a frame decoded by `session`.
    ///
    /// Returns `None` when the session is no longer the processing one.
    pub fn record_frame(
        &mut self,
        session: SessionId,
        timestamp: f64,
        frame: Frame,
    ) -> Option<FrameAccepted> {
        let processing = self.processing.as_mut().filter(|p| p.session == session)?;
        let cancelled = processing.cancelled;
        let task = &mut processing.task;
        task.received += 1;

        if cancelled {
            let drained = task.is_complete();
            if drained {
                self.processing = None;
            }
            return Some(FrameAccepted {
                progress: None,
                completed: None,
                drained,
            });
        }

        let progress = task.options.want_progressive_frames.then(|| Delivery {
            handler: task.handler.clone(),
            result: PreviewResult::new(
                task.id.clone(),
                Preview::ProgressImage {
                    image: frame.clone(),
                },
            ),
        });
        task.frames.push((timestamp, frame));

        let completed = if task.is_complete() {
            self.processing
                .take()
                .map(|processing| processing.task.into_animation())
        } else {
            None
        };

        Some(FrameAccepted {
            progress,
            completed,
            drained: false,
        })
    }

    /// Free the slot after its session failed or was abandoned.
    pub fn abort(&mut self, session: SessionId) -> Option<Aborted> {
        if self.processing_session() != Some(session) {
            return None;
        }
        self.processing.take().map(|p| {
            if p.cancelled {
                Aborted::Cancelled
            } else {
                Aborted::Running(p.task)
            }
        })
    }

    /// Withdraw the task currently owned by request `id`.
    ///
    /// A waiting task is removed outright. A processing task loses its caller
    /// and decoded frames at once but holds the slot until its session ends.
    pub fn cancel(&mut self, id: &RequestId) -> Option<Cancelled> {
        if let Some(processing) = self
            .processing
            .as_mut()
            .filter(|p| !p.cancelled && &p.task.id == id)
        {
            processing.cancelled = true;
            processing.task.frames = Vec::new();
            processing.task.handler = Arc::new(|_: PreviewResult| {});
            return Some(Cancelled::Processing(processing.session));
        }
        let index = self.waiting.iter().position(|t| &t.id == id)?;
        self.waiting.remove(index).map(Cancelled::Waiting)
    }

    /// Empty the queue, returning the session that was processing.
    pub fn clear(&mut self) -> Option<SessionId> {
        self.waiting.clear();
        self.processing.take().map(|p| p.session)
    }

    pub fn processing_session(&self) -> Option<SessionId> {
        self.processing.as_ref().map(|p| p.session)
    }

    #[cfg(test)]
    pub fn processing_id(&self) -> Option<&RequestId> {
        self.processing
            .as_ref()
            .filter(|p| !p.cancelled)
            .map(|p| &p.task.id)
    }

    pub fn is_busy(&self) -> bool {
        self.processing.is_some()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Whether request `id` still owns a waiting or processing task.
    #[cfg(test)]
    pub fn contains(&self, id: &RequestId) -> bool {
        self.processing_id() == Some(id) || self.waiting.iter().any(|t| &t.id == id)
    }
}
