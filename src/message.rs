//! Publish message types and the reusable message slot.

use crate::agent::QoS;

/// An owned outbound publish, handed to the agent by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl Publish {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, qos: QoS) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain: false,
        }
    }
}

/// A borrowed view of an incoming publish.
///
/// The agent hands this to dispatch callbacks on its own thread; the topic
/// and payload borrow the agent's network buffer and are only valid for the
/// duration of the callback. Anything that outlives the callback must be
/// copied out, which is what [`MessageSlot::fill`] does.
#[derive(Debug, Clone, Copy)]
pub struct PublishView<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
    pub dup: bool,
}

/// A reusable descriptor holding one copied incoming publish.
///
/// Slots circulate by value between a context's free queue, its incoming
/// queue, and the caller currently reading the message, so a slot is owned
/// by exactly one place at any time. The byte buffer is laid out as
/// `topic, NUL, payload, NUL` and only ever grows across reuses, which
/// amortizes allocation on the incoming path.
#[derive(Debug, Default)]
pub struct MessageSlot {
    topic_len: usize,
    payload_len: usize,
    qos: QoS,
    retain: bool,
    dup: bool,
    buffer: Vec<u8>,
}

impl MessageSlot {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub fn topic(&self) -> &str {
        // Topic bytes are copied from a `&str` in `fill`.
        std::str::from_utf8(&self.buffer[..self.topic_len])
            .expect("slot topic is valid utf-8")
    }

    pub fn payload(&self) -> &[u8] {
        if self.payload_len == 0 {
            return &[];
        }
        let start = self.topic_len + 1;
        &self.buffer[start..start + self.payload_len]
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn retain(&self) -> bool {
        self.retain
    }

    pub fn dup(&self) -> bool {
        self.dup
    }

    /// Allocated size of the backing buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Copies `publish` into the slot, growing the buffer if it is too
    /// small. A too-small buffer is replaced by one of exactly the required
    /// size; a large-enough buffer is reused as is.
    pub(crate) fn fill(&mut self, publish: &PublishView<'_>) {
        let topic = publish.topic.as_bytes();
        let required = topic.len() + 1 + publish.payload.len() + 1;
        if self.buffer.len() < required {
            self.buffer = vec![0u8; required];
        }

        self.buffer[..topic.len()].copy_from_slice(topic);
        self.buffer[topic.len()] = 0;
        let payload_start = topic.len() + 1;
        self.buffer[payload_start..payload_start + publish.payload.len()]
            .copy_from_slice(publish.payload);
        self.buffer[payload_start + publish.payload.len()] = 0;

        self.topic_len = topic.len();
        self.payload_len = publish.payload.len();
        self.qos = publish.qos;
        self.retain = publish.retain;
        self.dup = publish.dup;
    }

    /// Clears the message fields. With `free_buffer` the backing buffer is
    /// released as well, forcing a fresh allocation on next use.
    pub(crate) fn clear(&mut self, free_buffer: bool) {
        self.topic_len = 0;
        self.payload_len = 0;
        self.qos = QoS::default();
        self.retain = false;
        self.dup = false;
        if free_buffer {
            self.buffer = Vec::new();
        }
    }
}
