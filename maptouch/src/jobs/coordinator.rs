//! The job coordinator: submission, cancellation and exactly-once
//! completion delivery.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    ImageRenderRequest, ImageRenderer, JobError, JobId, JobKind, RealReachEngine,
    RealReachRequest,
};
use crate::events::MapEvent;

/// Handle to a submitted job.
///
/// Dropping the handle does not cancel the job; cancellation is explicit
/// and still produces the job's terminal notification (with an absent
/// result) rather than suppressing it.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    kind: JobKind,
    cancel: CancellationToken,
}

impl JobHandle {
    /// Identifier of the job.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Kind of the job.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Requests cancellation.
    ///
    /// The terminal notification is still delivered, reporting failure.
    pub fn cancel(&self) {
        debug!(job = %self.id, "Cancellation requested");
        self.cancel.cancel();
    }
}

/// Coordinates background jobs and funnels their completions to the
/// interactive thread.
///
/// Submissions of the same kind run independently: a new submission never
/// cancels a prior in-flight job, and each delivers its own completion.
pub struct JobCoordinator {
    renderer: Arc<dyn ImageRenderer>,
    real_reach: Arc<dyn RealReachEngine>,
    completions: mpsc::UnboundedSender<MapEvent>,
    in_flight: Arc<DashMap<JobId, JobKind>>,
}

impl JobCoordinator {
    /// Creates a coordinator with the given worker collaborators.
    ///
    /// Returns the coordinator and the completion channel the map view
    /// drains on its dispatch tick.
    pub fn new(
        renderer: Arc<dyn ImageRenderer>,
        real_reach: Arc<dyn RealReachEngine>,
    ) -> (Self, mpsc::UnboundedReceiver<MapEvent>) {
        let (completions, receiver) = mpsc::unbounded_channel();
        (
            Self {
                renderer,
                real_reach,
                completions,
                in_flight: Arc::new(DashMap::new()),
            },
            receiver,
        )
    }

    /// Number of jobs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Submits an image-render job.
    ///
    /// Must be called within a tokio runtime. Emits exactly one
    /// [`MapEvent::RenderFinished`] when the job reaches a terminal
    /// state, whether it succeeded, failed or was cancelled.
    pub fn submit_image_render(&self, request: ImageRenderRequest) -> JobHandle {
        let id = JobId::next();
        let cancel = CancellationToken::new();
        self.in_flight.insert(id, JobKind::ImageRender);
        debug!(job = %id, destination = %request.destination.display(), "Image render submitted");

        let renderer = Arc::clone(&self.renderer);
        let completions = self.completions.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let token = cancel.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(JobError::Cancelled),
                result = renderer.render(request) => result,
            };

            match &result {
                Ok(()) => debug!(job = %id, "Image render finished"),
                Err(error) => warn!(job = %id, %error, "Image render did not complete"),
            }

            in_flight.remove(&id);
            // The fire-and-forget contract: completion carries no payload
            // either way, but it is always delivered exactly once.
            if completions.send(MapEvent::RenderFinished { job: id }).is_err() {
                debug!(job = %id, "Completion channel closed");
            }
        });

        JobHandle {
            id,
            kind: JobKind::ImageRender,
            cancel,
        }
    }

    /// Submits a real-reach computation.
    ///
    /// Must be called within a tokio runtime. Emits exactly one
    /// [`MapEvent::RealReachCompleted`]; the bounding box is absent when
    /// the computation failed or was cancelled.
    pub fn submit_real_reach(&self, request: RealReachRequest) -> JobHandle {
        let id = JobId::next();
        let cancel = CancellationToken::new();
        self.in_flight.insert(id, JobKind::RealReach);
        debug!(job = %id, origin = %request.origin, "Real reach submitted");

        let engine = Arc::clone(&self.real_reach);
        let completions = self.completions.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let token = cancel.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(JobError::Cancelled),
                result = engine.compute(request) => result,
            };

            let bounding_box = match result {
                Ok(bbox) => {
                    debug!(job = %id, "Real reach completed");
                    Some(bbox)
                }
                Err(error) => {
                    warn!(job = %id, %error, "Real reach did not complete");
                    None
                }
            };

            in_flight.remove(&id);
            let event = MapEvent::RealReachCompleted {
                job: id,
                bounding_box,
            };
            if completions.send(event).is_err() {
                debug!(job = %id, "Completion channel closed");
            }
        });

        JobHandle {
            id,
            kind: JobKind::RealReach,
            cancel,
        }
    }
}
