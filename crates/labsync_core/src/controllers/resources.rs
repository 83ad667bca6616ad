//! crates/labsync_core/src/controllers/resources.rs

use std::sync::{Arc, Mutex};
use tracing::{error, info};

use super::lock;
use crate::domain::ResourceSuggestion;
use crate::notice::Notice;
use crate::ports::{ApiError, ApiResult, Clock, EngagementApi};

pub struct ResourceHubController {
    api: Arc<dyn EngagementApi>,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    notice: Mutex<Option<Notice>>,
}

impl ResourceHubController {
    pub fn new(api: Arc<dyn EngagementApi>, clock: Arc<dyn Clock>, token: Option<String>) -> Self {
        Self {
            api,
            clock,
            token,
            notice: Mutex::new(None),
        }
    }

    pub fn visible_notice(&self) -> Option<Notice> {
        let now = self.clock.now();
        lock(&self.notice).clone().filter(|n| n.is_visible(now))
    }

    /// Forwards a tool suggestion to the lab instructors.
    pub async fn suggest(&self, suggestion: ResourceSuggestion) -> ApiResult<()> {
        if suggestion.tool_name.trim().is_empty() || suggestion.description.trim().is_empty() {
            return Err(ApiError::validation("Tool name and description are required"));
        }
        let result = self
            .api
            .suggest_resource(self.token.as_deref(), &suggestion)
            .await;
        let now = self.clock.now();
        let mut notice = lock(&self.notice);
        match result {
            Ok(_) => {
                info!(tool = %suggestion.tool_name, "Resource suggestion submitted");
                *notice = Some(Notice::success(
                    "Suggestion submitted successfully! Thank you for your contribution.",
                    now,
                ));
                Ok(())
            }
            Err(err) => {
                error!("Suggestion failed: {}", err);
                *notice = Some(Notice::from_error(&err, now));
                Err(err)
            }
        }
    }
}
