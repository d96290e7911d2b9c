//! A scripted stand-in for the external protocol agent.
//!
//! Commands flow through a `SyncQueue` into a single worker thread that
//! executes them in order, mutates the subscription table on successful
//! subscribe/unsubscribe, and invokes every completion callback, the same
//! single-threaded discipline the real agent guarantees. The completion
//! status is scripted per test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tether::{
    AgentStatus, Command, CommandCallback, CommandSink, Error, PublishView, QoS, Result,
    SubscriptionRegistry, SyncQueue,
};

const MAX_SUBSCRIPTIONS: usize = 16;
const COMMAND_QUEUE_LEN: usize = 8;

pub struct ScriptedAgent {
    commands: Arc<SyncQueue<QueuedCommand>>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    status: Arc<Mutex<AgentStatus>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

struct QueuedCommand {
    command: Command,
    done: CommandCallback,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let commands = Arc::new(SyncQueue::<QueuedCommand>::new(COMMAND_QUEUE_LEN).unwrap());
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new(MAX_SUBSCRIPTIONS)));
        let status = Arc::new(Mutex::new(AgentStatus::Success));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let commands = Arc::clone(&commands);
            let registry = Arc::clone(&registry);
            let status = Arc::clone(&status);
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    let Some(queued) = commands.recv(Duration::from_millis(20)) else {
                        continue;
                    };
                    let outcome = *status.lock().unwrap();
                    match queued.command {
                        Command::Publish(_) => {}
                        Command::Subscribe {
                            filter, on_message, ..
                        } => {
                            if outcome.is_success() {
                                registry.lock().unwrap().add(&filter, on_message);
                            }
                        }
                        Command::Unsubscribe { filter } => {
                            if outcome.is_success() {
                                registry.lock().unwrap().remove(&filter);
                            }
                        }
                    }
                    (queued.done)(outcome);
                }
            })
        };

        Self {
            commands,
            registry,
            status,
            shutdown,
            worker: Some(worker),
        }
    }

    /// Sets the status the worker reports for every subsequent command.
    pub fn set_status(&self, status: AgentStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Simulates an incoming publish arriving on the agent thread. Returns
    /// whether any registered subscription handled it.
    pub fn deliver(&self, topic: &str, payload: &[u8], qos: QoS) -> bool {
        let publish = PublishView {
            topic,
            payload,
            qos,
            retain: false,
            dup: false,
        };
        let handled = self.registry.lock().unwrap().dispatch(&publish);
        if !handled {
            log::warn!("unsolicited publish on {topic}");
        }
        handled
    }

    pub fn is_subscribed(&self, filter: &str) -> bool {
        self.registry.lock().unwrap().contains(filter)
    }
}

impl CommandSink for ScriptedAgent {
    fn submit(&self, command: Command, done: CommandCallback, block_time: Duration) -> Result<()> {
        self.commands
            .send(QueuedCommand { command, done }, block_time)
            .map_err(|_| Error::SubmitRejected)
    }
}

impl Drop for ScriptedAgent {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
