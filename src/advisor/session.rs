//! Per-shopper chat log with a single in-flight request.

use serde::Serialize;
use crate::{Result, StorefrontError};
use super::GREETING;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Handed out by [`ChatSession::begin_send`]; redeemed by [`ChatSession::complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTicket {
    generation: u64,
    prompt: String,
}

impl ChatTicket {
    pub fn prompt(&self) -> &str { &self.prompt }
}

/// Append-only message log. At most one request is outstanding; a reply for any
/// ticket other than the outstanding one is dropped.
#[derive(Clone, Debug, Serialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    #[serde(skip)]
    generation: u64,
    #[serde(skip)]
    in_flight: Option<u64>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage { role: ChatRole::Assistant, text: GREETING.to_string() }],
            generation: 0,
            in_flight: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] { &self.messages }
    pub fn is_waiting(&self) -> bool { self.in_flight.is_some() }

    pub fn begin_send(&mut self, input: &str) -> Result<ChatTicket> {
        if input.trim().is_empty() { return Err(StorefrontError::EmptyMessage); }
        if self.in_flight.is_some() { return Err(StorefrontError::AdvisorBusy); }
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.messages.push(ChatMessage { role: ChatRole::User, text: input.to_string() });
        Ok(ChatTicket { generation: self.generation, prompt: input.to_string() })
    }

    /// Appends the reply if `ticket` is the outstanding one. Returns whether it was applied.
    pub fn complete(&mut self, ticket: &ChatTicket, reply: impl Into<String>) -> bool {
        if self.in_flight != Some(ticket.generation) { return false; }
        self.in_flight = None;
        self.messages.push(ChatMessage { role: ChatRole::Assistant, text: reply.into() });
        true
    }

    /// Forgets `ticket` if it is still outstanding, leaving the log untouched; its reply
    /// will be dropped. A newer request is not affected.
    pub fn abandon(&mut self, ticket: &ChatTicket) -> bool {
        if self.in_flight != Some(ticket.generation) { return false; }
        self.in_flight = None;
        true
    }
}

impl Default for ChatSession { fn default() -> Self { Self::new() } }
