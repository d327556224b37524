//! Change detection against the remote expense service.
//!
//! [`ChangeDetector::tick`] is the unit of work; [`spawn_detector`] drives it
//! on a background thread at a fixed interval.

mod cancel;
pub mod events;
mod poller;
mod runner;
mod source;

pub use cancel::CancellationToken;
pub use poller::{ChangeDetector, DetectorState, SkipReason, TickReport};
pub use runner::{spawn_detector, DetectorHandle};
pub use source::{HttpSnapshotSource, SnapshotSource};
