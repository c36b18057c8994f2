//! Lifecycle events published by indexing runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::indexer::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Start,
    Progress,
    Complete,
    Error,
}

impl EventType {
    /// Whether this event ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::Complete | EventType::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEvent {
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl IndexEvent {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            language: None,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

/// Receives lifecycle events. Implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: IndexEvent);
}

/// Forwards events over an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<IndexEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<IndexEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: IndexEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

/// Writes events to the tracing log.
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: IndexEvent) {
        let language = event.language.map(|l| l.as_str()).unwrap_or("-");
        match event.event_type {
            EventType::Error => error!(language, "{}", event.message),
            other => info!(event = ?other, language, "{}", event.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = IndexEvent::new(EventType::Progress, "running scip-go").with_language(Language::Go);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "progress");
        assert_eq!(value["language"], "go");
        assert_eq!(value["message"], "running scip-go");
        assert!(value["occurred_at"].is_string());

        let bare = serde_json::to_value(IndexEvent::new(EventType::Start, "go")).unwrap();
        assert!(bare.get("language").is_none());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        sink.publish(IndexEvent::new(EventType::Start, "started"));
        sink.publish(IndexEvent::new(EventType::Complete, "done"));

        assert_eq!(rx.recv().await.unwrap().event_type, EventType::Start);
        let last = rx.recv().await.unwrap();
        assert!(last.event_type.is_terminal());

        drop(rx);
        // Publishing with no receiver is silently ignored
        sink.publish(IndexEvent::new(EventType::Error, "late"));
    }

    #[test]
    fn test_log_sink_accepts_every_event_type() {
        for event_type in [EventType::Start, EventType::Progress, EventType::Complete, EventType::Error] {
            LogSink.publish(IndexEvent::new(event_type, "message").with_language(Language::Python));
        }
        assert!(EventType::Error.is_terminal());
        assert!(!EventType::Progress.is_terminal());
    }
}
