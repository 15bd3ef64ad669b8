//! Request State Tracker
//!
//! Keeps at most one live generation request per surface. A new generate
//! while a request is outstanding replaces it; the old result is discarded
//! when it eventually arrives.

mod machine;
mod request;

pub use machine::{Completion, RequestTracker, TrackerState, TrackerStats};
pub use request::{GenerationRequest, RequestId};
