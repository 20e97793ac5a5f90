//! Outcome notifications to chat/webhook endpoints.
//!
//! Payloads are composed by hand, so every embedded string goes through
//! [`json_escape`] first. Channel failures are logged and swallowed: the
//! call decision is final before anything is sent.

use crate::decision_engine::{CallState, Outcome};
use crate::transport::{HttpTransport, TransportError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

const COLOR_BLOCKED: u32 = 16711680; // red
const COLOR_OTHER: u32 = 3066993; // green

/// Escape a string for use inside a JSON string literal.
pub fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("fallback answered {status}: {body}")]
    FallbackRejected { status: u16, body: String },
}

/// One notification target.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(
        &self,
        transport: &dyn HttpTransport,
        outcome: &Outcome,
        timestamp: &str,
    ) -> Result<(), NotifyError>;
}

/// Chat webhook with an embed card (Discord-compatible).
///
/// A 400 for the embed is retried once as plain content.
pub struct RichChannel {
    endpoint: String,
    username: String,
}

impl RichChannel {
    pub fn new(endpoint: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
        }
    }

    pub fn summary(outcome: &Outcome, timestamp: &str) -> String {
        format!(
            "**PhoneBlock** `{}`\n• Number: `{}`\n• Votes: `{}`\n• Rating: `{}`\n• DID: `{}`\n• TS: `{}`",
            outcome.state, outcome.number, outcome.votes, outcome.rating, outcome.did, timestamp
        )
    }

    pub fn embed_payload(&self, outcome: &Outcome, timestamp: &str) -> String {
        let color = match outcome.state {
            CallState::Blocked => COLOR_BLOCKED,
            _ => COLOR_OTHER,
        };

        let field = |name: &str, value: &str, inline: bool| {
            format!(
                "{{\"name\":\"{}\",\"value\":\"{}\",\"inline\":{}}}",
                name,
                json_escape(value),
                inline
            )
        };

        let fields = [
            field("Number", &outcome.number, true),
            field("Votes", &outcome.votes.to_string(), true),
            field("Rating", &outcome.rating, true),
            field("DID", &outcome.did, true),
            field("TS", timestamp, false),
        ]
        .join(",");

        format!(
            "{{\"username\":\"{}\",\"content\":\"{}\",\"embeds\":[{{\"title\":\"{}\",\"color\":{},\"fields\":[{}]}}]}}",
            json_escape(&self.username),
            json_escape(&Self::summary(outcome, timestamp)),
            json_escape(&outcome.state.as_str().to_uppercase()),
            color,
            fields
        )
    }

    pub fn fallback_payload(outcome: &Outcome, timestamp: &str) -> String {
        format!(
            "{{\"content\":\"{}\"}}",
            json_escape(&Self::summary(outcome, timestamp))
        )
    }
}

#[async_trait]
impl NotificationChannel for RichChannel {
    fn name(&self) -> &str {
        "rich webhook"
    }

    async fn deliver(
        &self,
        transport: &dyn HttpTransport,
        outcome: &Outcome,
        timestamp: &str,
    ) -> Result<(), NotifyError> {
        let reply = transport
            .post_json(&self.endpoint, self.embed_payload(outcome, timestamp))
            .await?;

        if reply.is_success() {
            log::info!("PhoneBlock rich webhook OK ({})", reply.status);
            return Ok(());
        }

        if reply.status != 400 {
            return Err(NotifyError::Rejected {
                status: reply.status,
                body: reply.body,
            });
        }

        log::info!(
            "PhoneBlock rich webhook FAIL {}: {}; retrying as plain content",
            reply.status,
            reply.body
        );

        let fallback = transport
            .post_json(&self.endpoint, Self::fallback_payload(outcome, timestamp))
            .await?;

        if fallback.is_success() {
            log::info!("PhoneBlock rich webhook FALLBACK OK ({})", fallback.status);
            Ok(())
        } else {
            Err(NotifyError::FallbackRejected {
                status: fallback.status,
                body: fallback.body,
            })
        }
    }
}

/// Flat JSON object for generic webhook receivers.
pub struct CompactChannel {
    endpoint: String,
}

impl CompactChannel {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn payload(outcome: &Outcome, timestamp: &str) -> String {
        format!(
            "{{\"state\":\"{}\",\"number\":\"{}\",\"votes\":{},\"rating\":\"{}\",\"did\":\"{}\",\"ts\":\"{}\"}}",
            json_escape(outcome.state.as_str()),
            json_escape(&outcome.number),
            outcome.votes,
            json_escape(&outcome.rating),
            json_escape(&outcome.did),
            json_escape(timestamp)
        )
    }
}

#[async_trait]
impl NotificationChannel for CompactChannel {
    fn name(&self) -> &str {
        "generic webhook"
    }

    async fn deliver(
        &self,
        transport: &dyn HttpTransport,
        outcome: &Outcome,
        timestamp: &str,
    ) -> Result<(), NotifyError> {
        let reply = transport
            .post_json(&self.endpoint, Self::payload(outcome, timestamp))
            .await?;

        if reply.is_success() {
            log::debug!("PhoneBlock generic webhook OK ({})", reply.status);
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: reply.status,
                body: reply.body,
            })
        }
    }
}

/// Sends an outcome to every configured channel, one after another.
pub struct NotificationDispatcher {
    transport: Arc<dyn HttpTransport>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            channels: Vec::new(),
        }
    }

    /// Rich channel first, then compact. Blank endpoints disable a channel.
    pub fn from_endpoints(
        transport: Arc<dyn HttpTransport>,
        rich_endpoint: Option<&str>,
        compact_endpoint: Option<&str>,
        username: &str,
    ) -> Self {
        let mut dispatcher = Self::new(transport);
        if let Some(endpoint) = rich_endpoint.filter(|e| !e.trim().is_empty()) {
            dispatcher = dispatcher.with_channel(Box::new(RichChannel::new(endpoint, username)));
        }
        if let Some(endpoint) = compact_endpoint.filter(|e| !e.trim().is_empty()) {
            dispatcher = dispatcher.with_channel(Box::new(CompactChannel::new(endpoint)));
        }
        dispatcher
    }

    pub fn with_channel(mut self, channel: Box<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn notify(&self, outcome: &Outcome) {
        self.notify_at(outcome, Utc::now()).await
    }

    pub async fn notify_at(&self, outcome: &Outcome, at: DateTime<Utc>) {
        let timestamp = format_timestamp(&at);
        for channel in &self.channels {
            if let Err(e) = channel
                .deliver(self.transport.as_ref(), outcome, &timestamp)
                .await
            {
                log::warn!("PhoneBlock {} failed: {e}", channel.name());
            }
        }
    }
}
