use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::attachment::AttachmentInfo;

/// The role of a transcript entry's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend-assigned creation time of a persisted message (UTC)
///
/// Accepted on the wire as RFC 3339, RFC 2822, naive ISO 8601 (read as UTC)
/// or epoch seconds/milliseconds. Equality and ordering follow the instant.
/// The text the backend sent is kept and handed back verbatim as the
/// `before` cursor, so the backend compares against its own value.
#[derive(Debug, Clone)]
pub struct Timestamp {
    at: DateTime<Utc>,
    wire: Option<Arc<str>>,
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Integer epochs above this are milliseconds (year 5138 in seconds)
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

impl Timestamp {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at, wire: None }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Parse any of the textual formats the backend has been observed to emit
    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        parse_instant(s).map(|at| Self { at, wire: Some(Arc::from(s)) })
    }

    /// Build from epoch seconds; values past year 5138 are read as milliseconds
    pub fn from_epoch(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        parse_epoch(&value.to_string()).map(Self::new)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.at
    }

    /// Normalised RFC 3339 form, used for display
    pub fn to_rfc3339(&self) -> String {
        self.at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// The exact text the backend sent, or RFC 3339 for locally created stamps
    pub fn wire(&self) -> Cow<'_, str> {
        match &self.wire {
            Some(wire) => Cow::Borrowed(wire.as_ref()),
            None => Cow::Owned(self.to_rfc3339()),
        }
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }

    if let Ok(at) = DateTime::parse_from_rfc2822(s) {
        return Some(at.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| parse_epoch(s))
}

/// Decimal epoch parsed digit by digit, so no precision is lost to floats
fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(frac) {
        return None;
    }

    let whole = whole.parse::<i64>().ok()?;
    // fraction of one unit, in billionths
    let frac = frac.bytes().chain(std::iter::repeat(b'0')).take(9).fold(0i64, |acc, b| acc * 10 + i64::from(b - b'0'));

    let (secs, nanos) = if whole > EPOCH_MILLIS_THRESHOLD {
        (whole / 1000, (whole % 1000) * 1_000_000 + frac / 1000)
    } else {
        (whole, frac)
    };
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at)
    }
}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.at.hash(state);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::new(at)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTimestamp {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        let text = match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Text(s) => s,
            RawTimestamp::Integer(n) => n.to_string(),
            RawTimestamp::Float(n) if n.is_finite() => n.to_string(),
            RawTimestamp::Float(n) => return Err(serde::de::Error::custom(format!("timestamp out of range: {}", n))),
        };
        Timestamp::parse_str(&text).ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp: {}", text)))
    }
}

/// Body of a transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Text accompanied by an image reference (tagged `image`/`multimodal` replies)
    WithImage { text: String, image: String },
}

impl MessageContent {
    pub fn text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::WithImage { text, .. } => text,
        }
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            MessageContent::Text(_) => None,
            MessageContent::WithImage { image, .. } => Some(image),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty() && self.image().is_none()
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

/// Delivery state of an optimistic echo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoState {
    /// Submitted, waiting for the backend
    #[default]
    Pending,
    /// Backend accepted the message
    Delivered,
    /// Submission failed; the entry stays visible
    Failed,
}

/// Where a transcript entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from the persisted chat history
    History,
    /// Local echo of the user's own send
    Echo(EchoState),
    /// Assistant reply returned by a send
    Reply,
    /// Generated on the client (greeting, failure notice); never persisted
    Synthetic,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    /// Absent for echoes and synthetic entries
    pub timestamp: Option<Timestamp>,
    /// Client-side only; not persisted in the transcript
    pub attachment: Option<AttachmentInfo>,
    pub origin: Origin,
}

impl Message {
    /// A persisted message loaded from history
    pub fn history(role: Role, content: impl Into<MessageContent>, timestamp: Timestamp) -> Self {
        Self { role, content: content.into(), timestamp: Some(timestamp), attachment: None, origin: Origin::History }
    }

    /// The optimistic echo of an outgoing user message
    pub fn echo(text: impl Into<String>, attachment: Option<AttachmentInfo>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            timestamp: None,
            attachment,
            origin: Origin::Echo(EchoState::Pending),
        }
    }

    /// An assistant reply to a send
    pub fn reply(content: impl Into<MessageContent>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: None, attachment: None, origin: Origin::Reply }
    }

    /// A client-generated assistant entry
    pub fn synthetic(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
            timestamp: None,
            attachment: None,
            origin: Origin::Synthetic,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn text(&self) -> &str {
        self.content.text()
    }

    pub fn image(&self) -> Option<&str> {
        self.content.image()
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == Origin::Synthetic
    }

    /// Echo state, if this entry is an optimistic echo
    pub fn echo_state(&self) -> Option<EchoState> {
        match self.origin {
            Origin::Echo(state) => Some(state),
            _ => None,
        }
    }

    /// Whether this entry is still waiting on the backend
    pub fn is_pending(&self) -> bool {
        self.echo_state() == Some(EchoState::Pending)
    }

    /// Move an echo to a new delivery state; returns false for non-echo entries
    pub fn set_echo_state(&mut self, state: EchoState) -> bool {
        if let Origin::Echo(current) = &mut self.origin {
            *current = state;
            true
        } else {
            false
        }
    }
}
