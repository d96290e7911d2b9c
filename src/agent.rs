//! The seam between the bridge and the external protocol agent.
//!
//! The agent is a single-threaded asynchronous engine owned elsewhere. It
//! accepts commands through [`CommandSink::submit`] and runs them to
//! completion sequentially on its own thread, invoking every completion and
//! dispatch callback from that thread. Callbacks therefore must never block:
//! they record a result, signal an event, or hand a message to a queue with
//! a zero timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::message::{Publish, PublishView};
use crate::Result;

/// Message delivery level, mirroring the protocol's three service levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Result code the agent reports when a command finishes.
///
/// Bridge operations pass these through unchanged; a local wait timeout is
/// reported as [`Error::Timeout`](crate::Error::Timeout) instead and never
/// maps onto one of these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Success,
    NoMemory,
    SendFailed,
    BadResponse,
    Refused,
}

impl AgentStatus {
    pub fn is_success(self) -> bool {
        self == AgentStatus::Success
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Success => write!(f, "success"),
            AgentStatus::NoMemory => write!(f, "out of memory"),
            AgentStatus::SendFailed => write!(f, "send failed"),
            AgentStatus::BadResponse => write!(f, "bad response"),
            AgentStatus::Refused => write!(f, "refused by broker"),
        }
    }
}

/// Completion callback, invoked exactly once on the agent thread.
///
/// `FnOnce` makes the at-most-once invariant structural: the agent cannot
/// complete the same command twice because the callback is consumed by the
/// call.
pub type CommandCallback = Box<dyn FnOnce(AgentStatus) + Send>;

/// Per-subscription dispatch callback for incoming publishes, invoked
/// synchronously on the agent thread for every matching message.
pub type IncomingCallback = Arc<dyn Fn(&PublishView<'_>) + Send + Sync>;

/// A request submitted to the agent for asynchronous execution.
///
/// A subscribe carries the callback the agent registers in its subscription
/// table when the broker acknowledges the filter; an unsubscribe removes the
/// table entry on acknowledgement. Keeping the table inside the agent means
/// it is only ever touched from the agent thread.
pub enum Command {
    Publish(Publish),
    Subscribe {
        filter: String,
        qos: QoS,
        on_message: IncomingCallback,
    },
    Unsubscribe {
        filter: String,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Publish(publish) => f.debug_tuple("Publish").field(publish).finish(),
            Command::Subscribe { filter, qos, .. } => f
                .debug_struct("Subscribe")
                .field("filter", filter)
                .field("qos", qos)
                .finish_non_exhaustive(),
            Command::Unsubscribe { filter } => f
                .debug_struct("Unsubscribe")
                .field("filter", filter)
                .finish(),
        }
    }
}

/// Command submission interface of the external agent.
///
/// A successful return means only that the command was accepted into the
/// agent's queue, not that it ran; the outcome arrives later through `done`.
/// `block_time` bounds how long the submission itself may wait for queue
/// space.
///
/// # Errors
///
/// `Error::SubmitRejected` when the agent's queue did not accept the command
/// within `block_time`.
pub trait CommandSink: Send + Sync {
    fn submit(&self, command: Command, done: CommandCallback, block_time: Duration) -> Result<()>;
}
