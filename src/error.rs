use std::fmt;

use crate::agent::AgentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A queue or context was created with an unusable size.
    InvalidCapacity(&'static str),
    /// The agent did not accept the command into its queue.
    SubmitRejected,
    /// The local wait expired before the agent completed the command.
    /// Distinct from any status the agent itself reports.
    Timeout,
    /// The agent completed the command and reported a failure status.
    Agent(AgentStatus),
    /// The operation needs an incoming queue but the context was created
    /// with a queue capacity of zero.
    QueueDisabled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(msg) => write!(f, "invalid capacity: {msg}"),
            Error::SubmitRejected => write!(f, "command not accepted by the agent"),
            Error::Timeout => write!(f, "timed out waiting for command completion"),
            Error::Agent(status) => write!(f, "agent reported failure: {status}"),
            Error::QueueDisabled => write!(f, "context has no incoming message queue"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
