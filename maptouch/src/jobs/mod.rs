//! Asynchronous job coordination.
//!
//! Two long-running job kinds run off the interactive path: rendering a
//! map image to a file, and computing a real-reach (isochrone) polygon.
//! The [`JobCoordinator`] owns the worker collaborators, runs each
//! submission on a background task, and guarantees exactly one terminal
//! notification per job — success, failure and cancellation all notify,
//! never zero times and never twice.
//!
//! Completions are marshaled back to the interactive thread over a
//! channel the map view drains during its dispatch tick, so background
//! work never touches the observer directly.

mod coordinator;

pub use coordinator::{JobCoordinator, JobHandle};

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::geo::{BoundingBox, Coordinate};

/// Global sequence counter for job identifiers.
static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Identifier of a submitted job, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Allocates the next job id.
    pub(crate) fn next() -> Self {
        Self(JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// The kind of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Off-screen rendering of a map image to a file.
    ImageRender,
    /// Real-reach (isochrone) polygon computation.
    RealReach,
}

/// Terminal failure of a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The worker reported a failure.
    #[error("job failed: {0}")]
    Failed(String),

    /// The submitter cancelled the job. Cancellation still produces the
    /// terminal notification, reporting an absent result.
    #[error("job was cancelled")]
    Cancelled,
}

/// Travel budget for a real-reach computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TravelBudget {
    /// Maximum travel time.
    Time(Duration),
    /// Maximum travel distance in meters.
    Distance {
        /// Distance budget in meters.
        meters: f64,
    },
    /// Maximum energy spend in watt-hours (electric vehicles).
    Energy {
        /// Energy budget in watt-hours.
        watt_hours: f64,
    },
}

/// Travel mode for a real-reach computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    /// On foot.
    Pedestrian,
    /// By bicycle.
    Bicycle,
    /// By car.
    Car,
}

/// Parameters of a real-reach computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealReachRequest {
    /// Starting point of the reachability computation.
    pub origin: Coordinate,
    /// How far the traveler may go.
    pub budget: TravelBudget,
    /// How the traveler moves.
    pub mode: TravelMode,
}

/// Parameters of an image-render job.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRenderRequest {
    /// Geographic extent to render.
    pub bounding_box: BoundingBox,
    /// File the rendered image is written to.
    pub destination: PathBuf,
}

/// Renders map imagery to a file, off the interactive path.
///
/// External collaborator: the rendering pipeline is a black box behind
/// this trait. Implementations may take unbounded wall-clock time.
pub trait ImageRenderer: Send + Sync + 'static {
    /// Renders the requested extent to the destination file.
    fn render(&self, request: ImageRenderRequest) -> BoxFuture<'_, Result<(), JobError>>;
}

/// Computes real-reach (isochrone) polygons.
///
/// External collaborator: routing is a black box behind this trait.
/// The computation may involve remote services and take unbounded time.
pub trait RealReachEngine: Send + Sync + 'static {
    /// Computes the reachability polygon for the request and returns its
    /// bounding box.
    fn compute(&self, request: RealReachRequest) -> BoxFuture<'_, Result<BoundingBox, JobError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique_and_increasing() {
        let a = JobId::next();
        let b = JobId::next();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn test_job_id_display() {
        let id = JobId(42);
        assert_eq!(format!("{}", id), "job-42");
    }

    #[test]
    fn test_job_error_display() {
        assert_eq!(
            JobError::Failed("no routable network".into()).to_string(),
            "job failed: no routable network"
        );
        assert_eq!(JobError::Cancelled.to_string(), "job was cancelled");
    }
}
