//! BEACON Event Log
//!
//! Append-only stream of node status transitions produced by a dashboard
//! run and consumed by the presentation layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod stream;

pub use event::{NodeEvent, RunStatus};
pub use stream::{event_channel, ChannelSink, EventSink, EventStream, NullSink};
