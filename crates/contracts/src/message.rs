//! Message / Batch - Dispatcher input
//!
//! `Message` wraps an `Arc<str>` so a batch can be rebuilt into entries on
//! every send attempt without copying payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Opaque text payload, the atomic unit of dispatch content.
///
/// # Examples
/// ```
/// use contracts::Message;
///
/// let msg: Message = "temperature=21.5".into();
/// let copy = msg.clone(); // O(1), shares the payload
/// assert_eq!(msg, copy);
/// assert_eq!(msg.as_str(), "temperature=21.5");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Message(Arc<str>);

impl Message {
    /// Create a new message from a string slice.
    #[inline]
    pub fn new(body: &str) -> Self {
        Self(Arc::from(body))
    }

    /// Payload as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Message {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Message {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Message {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// Payloads can be large or sensitive, Debug only shows the length.
impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message(len={})", self.0.len())
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// Ordered sequence of messages sent together in one downstream call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    messages: Vec<Message>,
}

impl Batch {
    /// Create a batch from messages, keeping their order.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Messages in submission order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content fingerprint used to identify a batch in logs.
    ///
    /// Stable within a process run; the payload itself is never logged.
    pub fn fingerprint(&self) -> BatchFingerprint {
        let mut hasher = DefaultHasher::new();
        self.messages.hash(&mut hasher);
        BatchFingerprint(hasher.finish())
    }

    /// Build one entry per message for a single send attempt.
    ///
    /// Entry ids are the positional index; `dedup_token` is called once per
    /// entry so each attempt gets fresh tokens.
    pub fn to_entries(
        &self,
        group_id: &str,
        mut dedup_token: impl FnMut() -> String,
    ) -> Vec<BatchEntry> {
        self.messages
            .iter()
            .enumerate()
            .map(|(idx, message)| BatchEntry {
                id: idx.to_string(),
                body: message.clone(),
                group_id: group_id.to_string(),
                deduplication_id: dedup_token(),
            })
            .collect()
    }
}

impl From<Vec<Message>> for Batch {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}

impl<S: Into<Message>> FromIterator<S> for Batch {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Hex-rendered batch content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchFingerprint(pub u64);

impl fmt::Display for BatchFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Per-message record constructed for one send call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Positional index within the batch, stringified
    pub id: String,
    /// Message payload
    pub body: Message,
    /// Message group shared by every entry of the call
    pub group_id: String,
    /// Deduplication token, fresh per send attempt
    pub deduplication_id: String,
}
