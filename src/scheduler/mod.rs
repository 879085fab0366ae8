//! Scheduler
//!
//! Owns the [`SubsessionRegistry`] and the loop that moves raw samples from a
//! [`RawPayloadSource`](crate::channel::RawPayloadSource) into subsessions.
//!
//! ```text
//! RawPayloadSource ──poll──► Subsession ──frame──► Subscriber ──► Sink
//!                              ▲
//!            SubsessionRegistry┘ (register / attach / detach / update)
//! ```

pub mod config;
pub mod driver;
pub mod registry;

pub use config::SchedulerConfig;
pub use driver::{EventStep, Scheduler};
pub use registry::{SubsessionHandle, SubsessionRegistry};
