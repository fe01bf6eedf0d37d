//! Push notifications through an ntfy endpoint.
//!
//! Delivery is best effort: callers log a [`NotifyError`] and carry on.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::NotifySettings;

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message body.
    pub message: String,
    /// Title line.
    pub title: String,
    /// ntfy priority name.
    pub priority: String,
    /// ntfy tags.
    pub tags: Vec<String>,
}

impl Notification {
    /// Notification announcing a compiled document, titled and tagged from settings.
    #[must_use]
    pub fn document_ready(settings: &NotifySettings, document: &std::path::Path, pages: usize) -> Self {
        Self {
            message: format!(
                "PDF document \"{}\" with {} pages created successfully!",
                document.display(),
                pages
            ),
            title: settings.title.clone(),
            priority: settings.priority.clone(),
            tags: settings.tags.clone(),
        }
    }
}

/// Errors that can occur while delivering a notification.
#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    /// The request could not be sent.
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint rejected the notification.
    #[error("notification rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

/// Delivers notifications.
pub trait Notifier {
    /// Send one notification.
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// ntfy publisher: POST the message to the topic URL with title/priority/tags headers.
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
}

impl NtfyNotifier {
    /// Publisher for `settings`, or `None` when no endpoint is configured.
    pub fn from_settings(settings: &NotifySettings) -> Result<Option<Self>, NotifyError> {
        let Some(url) = &settings.url else {
            return Ok(None);
        };
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Some(Self {
            client,
            url: url.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }))
    }
}

impl Notifier for NtfyNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Title", &notification.title)
            .header("Priority", &notification.priority)
            .header("Tags", notification.tags.join(","))
            .body(notification.message.clone());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        log::info!("Notification sent to {}", self.url);
        Ok(())
    }
}
