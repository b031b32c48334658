use serde::Serialize;
use crate::config::EmailSettings;
use crate::models::{Deal, StatusHistoryEntry};
use crate::services::{http_client, ApiError};
use crate::utils::{escape_html, format_timestamp};

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// Transactional email provider
pub trait Mailer {
    fn send(&self, message: &EmailMessage) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

/// Mailer posting `{from, to, subject, html}` as JSON with a bearer key
pub struct HttpMailer {
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: String, from: String) -> Self {
        Self { endpoint, api_key, from }
    }

    pub fn from_settings(settings: &EmailSettings) -> Self {
        Self::new(settings.endpoint.clone(), settings.api_key.clone(), settings.from.clone())
    }
}

impl Mailer for HttpMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), ApiError> {
        let request = SendRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html_body,
        };
        let response = http_client()?
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            Err(ApiError::Server(format!("{} {}", status, snippet).trim().to_string()))
        }
    }
}

/// Email describing one stage transition
pub fn transition_email(deal: &Deal, entry: &StatusHistoryEntry, actor_name: Option<&str>) -> EmailMessage {
    let deal_ref = deal.id.map(|id| format!("#{}", id)).unwrap_or_default();
    let previous = entry
        .previous_stage
        .as_ref()
        .map(|s| format!("{} {}", s.as_stored(), s.label()))
        .unwrap_or_else(|| "-".to_string());
    let new = format!("{} {}", entry.new_stage.as_stored(), entry.new_stage.label());

    let subject = format!("[BAO Flow] Deal {} {}: {}", deal_ref, deal.title, entry.new_stage.label());
    let html_body = format!(
        "<h2>Deal {} {}</h2>\
         <table>\
         <tr><th align=\"left\">From</th><td>{}</td></tr>\
         <tr><th align=\"left\">To</th><td><strong>{}</strong></td></tr>\
         <tr><th align=\"left\">Note</th><td>{}</td></tr>\
         <tr><th align=\"left\">By</th><td>{}</td></tr>\
         <tr><th align=\"left\">At</th><td>{}</td></tr>\
         </table>",
        escape_html(&deal_ref),
        escape_html(&deal.title),
        escape_html(&previous),
        escape_html(&new),
        escape_html(&entry.note),
        escape_html(actor_name.or(entry.actor.as_deref()).unwrap_or("-")),
        escape_html(&format_timestamp(entry.created_ts)),
    );

    EmailMessage {
        to: Vec::new(),
        subject,
        html_body,
    }
}

/// Send a transition notice. Failures are logged and reported as `false`, never retried.
pub fn notify_transition(
    mailer: &dyn Mailer,
    recipients: &[String],
    deal: &Deal,
    entry: &StatusHistoryEntry,
    actor_name: Option<&str>,
) -> bool {
    if recipients.is_empty() {
        log::debug!("No notification recipients configured");
        return false;
    }
    let mut message = transition_email(deal, entry, actor_name);
    message.to = recipients.to_vec();

    match mailer.send(&message) {
        Ok(()) => {
            log::info!("Sent transition notice for deal {:?} to {} recipient(s)", deal.id, recipients.len());
            true
        }
        Err(e) => {
            log::warn!("Failed to send transition notice for deal {:?}: {}", deal.id, e);
            false
        }
    }
}
