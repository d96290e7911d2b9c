//! Blocking publish/subscribe bridge over a single-threaded protocol agent.
//!
//! The agent (external to this crate) executes commands asynchronously and
//! reports completion through callbacks on its own thread. This crate lets
//! ordinary threads drive it with blocking, timeout-bounded calls:
//!
//! - [`SyncQueue`]: bounded FIFO with timed blocking send/receive, usable on
//!   its own for any producer/consumer need.
//! - [`SyncEvent`]: one-shot auto-resetting event, the completion signal.
//! - [`UserContext`]: per-caller bridge state: blocking publish, subscribe
//!   and unsubscribe, plus a recycled-slot queue for incoming messages that
//!   never blocks the agent thread.
//! - [`SubscriptionRegistry`]: the filter → callback table an agent
//!   implementation owns and mutates on its own thread.
//!
//! # The in-flight hazard
//!
//! A bridge call that times out locally cannot retract the command already
//! handed to the agent; the completion callback may fire afterwards. Every
//! callback holds its own `Arc<UserContext>`, so a late completion writes
//! into a live context rather than freed memory, and the next operation on
//! that context drains the stale event before submitting. What a late
//! completion cannot do is reach the caller that already gave up; that
//! result is dropped.

pub mod agent;
pub mod bridge;
pub mod error;
pub mod event;
pub mod message;
pub mod queue;
pub mod registry;

pub use agent::{AgentStatus, Command, CommandCallback, CommandSink, IncomingCallback, QoS};
pub use bridge::UserContext;
pub use error::{Error, Result};
pub use event::SyncEvent;
pub use message::{MessageSlot, Publish, PublishView};
pub use queue::SyncQueue;
pub use registry::{matches_filter, SubscriptionRegistry};
