//! MapTouch - Map interaction and event dispatch core
//!
//! This library models the interactive surface of a slippy map: it turns
//! raw pointer samples into semantic gestures, tracks the viewport's
//! region-change lifecycle, resolves taps against a spatial index of map
//! entities, coordinates long-running background jobs, and delivers every
//! resulting notification through a single observer channel.
//!
//! # Architecture
//!
//! ```text
//! Pointer Samples ──► GestureClassifier ──► MapView ──► EventDispatcher ──► Observer
//!                                            │  ▲
//!                     SpatialIndex ◄─────────┘  │
//!                     RegionTracker ◄───────────┤
//!                     JobCoordinator ───────────┘ (completions on tick)
//! ```
//!
//! The [`view::MapView`] is the single-threaded coordination point. The
//! host feeds it input via [`view::MapView::handle_pointer`] and drives
//! deferred work (tap promotion, coalesced region updates, job
//! completions) by calling [`view::MapView::tick`] once per frame.

#![warn(missing_docs)]

pub mod entity;
pub mod events;
pub mod geo;
pub mod gesture;
pub mod hittest;
pub mod index;
pub mod jobs;
pub mod region_change;
pub mod telemetry;
pub mod view;
pub mod viewport;

pub use events::{EventKind, MapEvent, MapEventReceiver, Subscriptions};
pub use geo::{BoundingBox, Coordinate, GeoError, Region, ScreenPoint, ScreenRect};
pub use view::{ConnectivityMode, MapView, MapViewBuilder};
