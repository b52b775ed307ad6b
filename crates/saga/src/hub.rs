//! Live step-log hub.
//!
//! A single owner task holds the subscriber registry and the retained
//! per-run sequences; subscribe, unsubscribe, broadcast and snapshot all
//! arrive as messages on one channel, so the registry needs no lock. Each
//! subscriber gets a bounded buffer: one that fills up is evicted rather
//! than ever backpressuring a saga run.

use std::collections::{HashMap, VecDeque};

use common::ProcessId;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::log::StepLogEntry;

const COMMAND_BUFFER: usize = 256;
const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;
const DEFAULT_RETAINED_RUNS: usize = 256;

/// Identity of a live subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

/// A live subscription: entries arrive in emission order.
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<StepLogEntry>,
}

enum Command {
    Subscribe {
        reply: oneshot::Sender<Subscription>,
    },
    Unsubscribe {
        id: SubscriberId,
    },
    Publish {
        entry: StepLogEntry,
    },
    Snapshot {
        process_id: ProcessId,
        reply: oneshot::Sender<Vec<StepLogEntry>>,
    },
    SubscriberCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the hub's owner task. Cheap to clone; all clones address the
/// same registry and retained store.
#[derive(Clone)]
pub struct LogHub {
    commands: mpsc::Sender<Command>,
}

impl LogHub {
    /// Creates a hub with the default limits. Must be called within a tokio
    /// runtime; the owner task lives until the last handle is dropped.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_RETAINED_RUNS, DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Creates a hub retaining at most `retained_runs` run logs and giving
    /// each subscriber a buffer of `subscriber_buffer` entries.
    pub fn with_limits(retained_runs: usize, subscriber_buffer: usize) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run_hub(receiver, retained_runs, subscriber_buffer));
        Self { commands }
    }

    /// Registers a live subscriber. Returns `None` if the hub task is gone.
    pub async fn subscribe(&self) -> Option<Subscription> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::Subscribe { reply }).await.ok()?;
        response.await.ok()
    }

    /// Drops a subscriber from the registry.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.commands.send(Command::Unsubscribe { id }).await;
    }

    /// Appends an entry to its run's retained sequence and fans it out to
    /// every live subscriber.
    pub async fn publish(&self, entry: StepLogEntry) {
        if self.commands.send(Command::Publish { entry }).await.is_err() {
            tracing::warn!("log hub task terminated, dropping entry");
        }
    }

    /// Returns a consistent snapshot of a run's retained log.
    pub async fn snapshot(&self, process_id: ProcessId) -> Vec<StepLogEntry> {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(Command::Snapshot { process_id, reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        response.await.unwrap_or_default()
    }

    /// Number of live subscribers.
    pub async fn subscriber_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(Command::SubscriberCount { reply })
            .await
            .is_err()
        {
            return 0;
        }
        response.await.unwrap_or(0)
    }
}

struct HubState {
    subscribers: HashMap<SubscriberId, mpsc::Sender<StepLogEntry>>,
    retained: HashMap<String, Vec<StepLogEntry>>,
    retained_order: VecDeque<String>,
    retained_runs: usize,
    subscriber_buffer: usize,
}

impl HubState {
    fn retain(&mut self, entry: &StepLogEntry) {
        let Some(process_id) = &entry.process_id else {
            return;
        };
        let key = process_id.as_str().to_string();

        if !self.retained.contains_key(&key) {
            self.retained_order.push_back(key.clone());
            if self.retained_order.len() > self.retained_runs
                && let Some(oldest) = self.retained_order.pop_front()
            {
                self.retained.remove(&oldest);
            }
        }
        self.retained.entry(key).or_default().push(entry.clone());
    }

    fn broadcast(&mut self, entry: &StepLogEntry) {
        let mut evicted = Vec::new();
        for (id, sender) in &self.subscribers {
            if sender.try_send(entry.clone()).is_err() {
                evicted.push(*id);
            }
        }
        for id in evicted {
            self.subscribers.remove(&id);
            tracing::warn!(subscriber = ?id, "evicted slow log subscriber");
        }
    }
}

async fn run_hub(
    mut commands: mpsc::Receiver<Command>,
    retained_runs: usize,
    subscriber_buffer: usize,
) {
    let mut state = HubState {
        subscribers: HashMap::new(),
        retained: HashMap::new(),
        retained_order: VecDeque::new(),
        retained_runs,
        subscriber_buffer,
    };

    while let Some(command) = commands.recv().await {
        match command {
            Command::Subscribe { reply } => {
                let id = SubscriberId(Uuid::new_v4());
                let (sender, receiver) = mpsc::channel(state.subscriber_buffer);
                if reply.send(Subscription { id, receiver }).is_ok() {
                    state.subscribers.insert(id, sender);
                }
            }
            Command::Unsubscribe { id } => {
                state.subscribers.remove(&id);
            }
            Command::Publish { entry } => {
                state.retain(&entry);
                state.broadcast(&entry);
            }
            Command::Snapshot { process_id, reply } => {
                let entries = state
                    .retained
                    .get(process_id.as_str())
                    .cloned()
                    .unwrap_or_default();
                let _ = reply.send(entries);
            }
            Command::SubscriberCount { reply } => {
                let _ = reply.send(state.subscribers.len());
            }
        }
    }
}
