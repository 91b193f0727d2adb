//! Client-side proximity tracking.

pub mod runner;
pub mod sink;
pub mod source;
pub mod state;

pub use runner::{ActiveShift, ProximityTracker, TrackerSettings, TrackerSummary};
pub use sink::{EventSink, HttpSink, LocalSink};
pub use source::{PositionSource, ReplaySource};
pub use state::{Decision, ShiftTracker, ThrottleLedger};
