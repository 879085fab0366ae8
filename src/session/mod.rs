//! Subsessions and subscribers
//!
//! A [`Subsession`] serves one sub-stream (video or audio) of one channel.
//! It owns the channel's sample store and one [`Subscriber`] per attached
//! client.
//!
//! ```text
//!                       Subsession (channel 1, video)
//!                ┌─────────────────────────────────────┐
//!  raw sample ──►│ store: SampleStore                  │
//!                │ subscribers: [Subscriber, ...]      │
//!                └──────┬──────────────┬───────────────┘
//!                       │              │   Bytes snapshot shared
//!                       ▼              ▼
//!                 [Subscriber]    [Subscriber]   frame + gate + backlog
//!                       │              │
//!                       ▼              ▼
//!                 AccessUnitSink  AccessUnitSink  (transport, on demand)
//! ```
//!
//! Lifecycle notifications are emitted as [`SessionEvent`]s.

pub mod backlog;
pub mod config;
pub mod event;
pub mod sink;
pub mod subscriber;
pub mod subsession;

pub use backlog::Backlog;
pub use config::SubsessionConfig;
pub use event::{event_channel, EventReceiver, EventSender, SessionEvent};
pub use sink::{AccessUnitSink, DeliveredFrame};
pub use subscriber::{Subscriber, SubscriberState};
pub use subsession::Subsession;
