//! Session actor for one input surface
//!
//! Front-ends talk to a [`Session`] handle; the actor owns the composer,
//! tracker and surface and is the only place they are mutated.

mod manager;
mod messages;

pub use manager::{Session, SessionOptions, wait_settled};
pub use messages::{SessionCommand, SessionError, SessionEvent, SessionResponse, SurfaceView};
