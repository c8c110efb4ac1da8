use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("calendar notifier error: {message}")]
pub struct CalendarError {
    pub message: String,
}

/// Outbound seam to the calendar service. Best-effort: callers log failures
/// and move on, they never retry or roll back on account of the calendar.
#[async_trait]
pub trait CalendarNotifier: Send + Sync {
    /// Ask the calendar to strip the deleted project from these events.
    async fn remove_project_from_events(&self, event_ids: &[String]) -> Result<(), CalendarError>;
}

/// No-op notifier for tests and the demo CLI.
pub struct NullCalendarNotifier;

#[async_trait]
impl CalendarNotifier for NullCalendarNotifier {
    async fn remove_project_from_events(&self, _event_ids: &[String]) -> Result<(), CalendarError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct RemovalRequest<'a> {
    events: &'a [String],
}

/// HTTP notifier posting to the calendar service.
pub struct HttpCalendarNotifier {
    client: reqwest::Client,
    base_url: String,
    stage: String,
}

impl HttpCalendarNotifier {
    pub fn new(base_url: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            stage: stage.into(),
        }
    }

    /// The production calendar lives under the path segment `calendar`
    /// rather than its stage name; every other stage uses its own name.
    fn endpoint_url(&self) -> String {
        let stage = if self.stage == "prod" {
            "calendar"
        } else {
            self.stage.as_str()
        };
        format!(
            "{}/{}/remove-project-from-events",
            self.base_url.trim_end_matches('/'),
            stage
        )
    }
}

#[async_trait]
impl CalendarNotifier for HttpCalendarNotifier {
    async fn remove_project_from_events(&self, event_ids: &[String]) -> Result<(), CalendarError> {
        let resp = self
            .client
            .post(self.endpoint_url())
            .json(&RemovalRequest { events: event_ids })
            .send()
            .await
            .map_err(|e| CalendarError {
                message: format!("HTTP error: {e}"),
            })?;

        if !resp.status().is_success() {
            return Err(CalendarError {
                message: format!("HTTP status: {}", resp.status()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prod_stage_maps_to_calendar_path() {
        let n = HttpCalendarNotifier::new("https://calendar.photonranch.org", "prod");
        assert_eq!(
            n.endpoint_url(),
            "https://calendar.photonranch.org/calendar/remove-project-from-events"
        );
    }

    #[test]
    fn other_stages_keep_their_name() {
        let n = HttpCalendarNotifier::new("https://calendar.photonranch.org/", "dev");
        assert_eq!(
            n.endpoint_url(),
            "https://calendar.photonranch.org/dev/remove-project-from-events"
        );
    }
}
