//! Synchronous command bridge over the asynchronous agent.
//!
//! A [`UserContext`] makes callback-completed agent commands look like
//! blocking calls. The caller submits a command whose completion callback
//! records the agent's status and sets the context's event, then blocks on
//! that event with a timeout:
//!
//! ```text
//! caller thread                      agent thread
//! ─────────────                      ────────────
//! publish()
//!   ├─ submit(command, done)  ───►   ...runs command...
//!   └─ event.wait(timeout)    ◄───   done(status): store + event.set()
//!        └─ read stored status
//! ```
//!
//! For incoming traffic the context optionally owns a pair of
//! equal-capacity slot queues. The dispatcher runs on the agent thread and
//! must never block: it takes a free slot with a zero timeout, copies the
//! message in, and pushes the slot onto the incoming queue with a zero
//! timeout. When the free pool is exhausted the newest message is shed
//! rather than stalling the agent.
//!
//! One context serves one logical caller at a time: the event and the
//! stored status are single-slot state, so overlapping operations on the
//! same context would race each other's completions. Callers needing
//! parallel operations use one context per thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::agent::{AgentStatus, Command, CommandCallback, CommandSink, IncomingCallback, QoS};
use crate::event::SyncEvent;
use crate::message::{MessageSlot, Publish, PublishView};
use crate::queue::SyncQueue;
use crate::{Error, Result};

pub struct UserContext {
    event: SyncEvent,
    last_status: Mutex<AgentStatus>,
    queues: Option<SlotQueues>,
    dropped: AtomicU64,
}

struct SlotQueues {
    incoming: SyncQueue<MessageSlot>,
    free: SyncQueue<MessageSlot>,
}

impl UserContext {
    /// Creates a context with `queue_capacity` preallocated message slots.
    ///
    /// A capacity of zero disables the incoming-queue feature; the context
    /// can still run publish/subscribe commands with caller-supplied
    /// callbacks. All slots start in the free queue.
    ///
    /// The context is handed out as an `Arc` because completion callbacks
    /// keep a clone: a command that outlives a timed-out caller completes
    /// into a context that is still alive instead of into freed memory.
    pub fn new(queue_capacity: usize) -> Result<Arc<Self>> {
        let queues = if queue_capacity > 0 {
            let incoming = SyncQueue::new(queue_capacity)?;
            let free = SyncQueue::new(queue_capacity)?;
            for _ in 0..queue_capacity {
                if free.send(MessageSlot::empty(), Duration::ZERO).is_err() {
                    return Err(Error::InvalidCapacity("slot pool exceeds queue capacity"));
                }
            }
            Some(SlotQueues { incoming, free })
        } else {
            None
        };

        Ok(Arc::new(Self {
            event: SyncEvent::new(),
            last_status: Mutex::new(AgentStatus::Success),
            queues,
            dropped: AtomicU64::new(0),
        }))
    }

    /// Publishes `message`, blocking until the agent completes the command
    /// or `timeout` expires.
    ///
    /// The agent's status is passed through unchanged: `Ok(())` for
    /// success, `Error::Agent` for an agent-reported failure. A local
    /// timeout returns `Error::Timeout`; the command may still complete
    /// later on the agent thread (see crate docs on the in-flight hazard).
    pub fn publish(
        self: &Arc<Self>,
        sink: &dyn CommandSink,
        message: Publish,
        timeout: Duration,
    ) -> Result<()> {
        self.run_command(sink, Command::Publish(message), timeout)
    }

    /// Subscribes to `filter`, routing matching publishes to `on_message`.
    ///
    /// On broker acknowledgement the agent registers `on_message` in its
    /// subscription table before completing the command. At most one
    /// command per `(context, filter)` pair may be outstanding; the bridge
    /// does not serialize this itself.
    pub fn subscribe(
        self: &Arc<Self>,
        sink: &dyn CommandSink,
        filter: &str,
        qos: QoS,
        on_message: IncomingCallback,
        timeout: Duration,
    ) -> Result<()> {
        self.run_command(
            sink,
            Command::Subscribe {
                filter: filter.to_string(),
                qos,
                on_message,
            },
            timeout,
        )
    }

    /// Unsubscribes from `filter`; the agent drops the table entry on
    /// broker acknowledgement.
    pub fn unsubscribe(
        self: &Arc<Self>,
        sink: &dyn CommandSink,
        filter: &str,
        timeout: Duration,
    ) -> Result<()> {
        self.run_command(
            sink,
            Command::Unsubscribe {
                filter: filter.to_string(),
            },
            timeout,
        )
    }

    /// Subscribes to `filter` with the context's own dispatcher as the
    /// callback, so matching publishes land in the incoming queue for
    /// [`recv_incoming`](Self::recv_incoming).
    ///
    /// # Errors
    ///
    /// `Error::QueueDisabled` when the context was created with a queue
    /// capacity of zero.
    pub fn subscribe_queued(
        self: &Arc<Self>,
        sink: &dyn CommandSink,
        filter: &str,
        qos: QoS,
        timeout: Duration,
    ) -> Result<()> {
        if self.queues.is_none() {
            return Err(Error::QueueDisabled);
        }
        let dispatch_ctx = Arc::clone(self);
        let on_message: IncomingCallback =
            Arc::new(move |publish| dispatch_ctx.enqueue_incoming(publish));
        self.subscribe(sink, filter, qos, on_message, timeout)
    }

    /// Counterpart of [`subscribe_queued`](Self::subscribe_queued).
    pub fn unsubscribe_queued(
        self: &Arc<Self>,
        sink: &dyn CommandSink,
        filter: &str,
        timeout: Duration,
    ) -> Result<()> {
        if self.queues.is_none() {
            return Err(Error::QueueDisabled);
        }
        self.unsubscribe(sink, filter, timeout)
    }

    /// Takes the oldest queued incoming message, blocking up to `timeout`.
    ///
    /// The caller owns the returned slot until it hands it back through
    /// [`release`](Self::release).
    pub fn recv_incoming(&self, timeout: Duration) -> Option<MessageSlot> {
        self.queues.as_ref()?.incoming.recv(timeout)
    }

    /// Returns `slot` to the free pool. With `free_buffer` the slot's
    /// backing buffer is released first, forcing a fresh allocation on its
    /// next use.
    pub fn release(&self, mut slot: MessageSlot, free_buffer: bool) {
        slot.clear(free_buffer);
        if let Some(queues) = &self.queues {
            // Total slots equal queue capacity, so the free queue always
            // has room for a slot coming back.
            if queues.free.send(slot, Duration::ZERO).is_err() {
                log::warn!("free queue rejected a returned slot; slot dropped");
            }
        }
    }

    /// Incoming messages shed by the dispatcher because the free pool was
    /// exhausted.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Slot capacity of the incoming queue; zero when the feature is
    /// disabled.
    pub fn queue_capacity(&self) -> usize {
        self.queues.as_ref().map_or(0, |queues| queues.incoming.capacity())
    }

    /// Number of messages currently waiting in the incoming queue.
    pub fn pending_incoming(&self) -> usize {
        self.queues.as_ref().map_or(0, |queues| queues.incoming.len())
    }

    fn run_command(
        self: &Arc<Self>,
        sink: &dyn CommandSink,
        command: Command,
        timeout: Duration,
    ) -> Result<()> {
        // A completion that arrived after a previous operation timed out
        // locally leaves the event set; consume it so this command does not
        // return that stale result.
        let _ = self.event.wait(Duration::ZERO);

        let completion_ctx = Arc::clone(self);
        let done: CommandCallback = Box::new(move |status| {
            *completion_ctx.lock_status() = status;
            completion_ctx.event.set();
        });
        sink.submit(command, done, timeout)?;

        if !self.event.wait(timeout) {
            return Err(Error::Timeout);
        }
        let status = *self.lock_status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Agent(status))
        }
    }

    /// Dispatcher body, run on the agent thread. Never blocks: both queue
    /// operations use a zero timeout, and overflow sheds the newest message.
    fn enqueue_incoming(&self, publish: &PublishView<'_>) {
        let Some(queues) = &self.queues else {
            return;
        };
        let Some(mut slot) = queues.free.recv(Duration::ZERO) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::debug!("free pool exhausted, dropping publish on {}", publish.topic);
            return;
        };
        slot.fill(publish);
        if queues.incoming.send(slot, Duration::ZERO).is_err() {
            // Cannot happen while total slots equal queue capacity; the
            // slot is lost to the pool until the context is torn down.
            log::warn!("incoming queue rejected a filled slot on {}", publish.topic);
        }
    }

    fn lock_status(&self) -> MutexGuard<'_, AgentStatus> {
        self.last_status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
