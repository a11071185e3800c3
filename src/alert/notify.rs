//! Push notifications for newly classified issues.
//!
//! Each issue is sent as its own message to a notify-style endpoint: a
//! form-encoded `message` field with a bearer token.

use std::time::Duration;

use crate::logging::{self, Component};
use crate::model::Issue;

/// Longest message the endpoint accepts.
pub const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, PartialEq)]
pub enum NotifyError {
    EmptyMessage,
    MissingToken,
    MessageTooLong(usize),
    HttpError(u16),
    RequestFailed(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::EmptyMessage => write!(f, "Refusing to send an empty message"),
            NotifyError::MissingToken => write!(f, "No notify token configured"),
            NotifyError::MessageTooLong(len) => write!(
                f,
                "Message is {} characters, limit is {}",
                len, MAX_MESSAGE_CHARS
            ),
            NotifyError::HttpError(code) => write!(f, "HTTP error: {}", code),
            NotifyError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Human-readable alert text for one issue.
pub fn format_alert_message(issue: &Issue) -> String {
    let mut message = format!("Sensor alert: {}\n", issue.kind);
    message.push_str(&format!(
        "Time: {}\n",
        issue.timestamp.as_deref().unwrap_or("unknown")
    ));
    if let Some(sensor) = &issue.sensor_id {
        message.push_str(&format!("Sensor: {}\n", sensor));
    }
    message.push('\n');
    message.push_str(&issue.details);
    message
}

/// Checks a message against the endpoint's limits before sending.
pub fn validate_message(message: &str) -> Result<(), NotifyError> {
    if message.trim().is_empty() {
        return Err(NotifyError::EmptyMessage);
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(NotifyError::MessageTooLong(len));
    }
    Ok(())
}

pub struct Notifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

impl Notifier {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }

    /// Sends one raw message.
    pub fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        validate_message(message)?;
        let token = self.token.as_deref().ok_or(NotifyError::MissingToken)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .form(&[("message", message)])
            .send()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpError(response.status().as_u16()));
        }
        Ok(())
    }

    /// Sends issues in order and stops at the first failure, which is logged.
    ///
    /// Returns how many issues from the front of `issues` were delivered.
    pub fn notify_all(&self, issues: &[Issue]) -> usize {
        for (delivered, issue) in issues.iter().enumerate() {
            if let Err(e) = self.send_message(&format_alert_message(issue)) {
                logging::error(
                    Component::Notifier,
                    issue.sensor_id.as_deref(),
                    &format!("Alert for {} not sent: {}", issue.kind, e),
                );
                return delivered;
            }
        }
        issues.len()
    }
}
