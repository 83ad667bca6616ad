//! crates/labsync_core/src/controllers/schedule.rs
//!
//! Lab bookings. Booking and cancelling are assistant-level actions; the
//! backend enforces that, the controller only carries the token.

use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

use super::lock;
use crate::domain::{NewSchedule, ScheduleEntry};
use crate::inflight::RequestGeneration;
use crate::notice::Notice;
use crate::ports::{ApiError, ApiResult, Clock, ScheduleApi};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    pub schedules: Vec<ScheduleEntry>,
    pub lab_rooms: Vec<String>,
    pub loading: bool,
    pub notice: Option<Notice>,
}

pub struct ScheduleController {
    api: Arc<dyn ScheduleApi>,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    generation: RequestGeneration,
    state: Mutex<ScheduleState>,
}

impl ScheduleController {
    pub fn new(api: Arc<dyn ScheduleApi>, clock: Arc<dyn Clock>, token: Option<String>) -> Self {
        Self {
            api,
            clock,
            token,
            generation: RequestGeneration::new(),
            state: Mutex::new(ScheduleState {
                loading: true,
                ..ScheduleState::default()
            }),
        }
    }

    pub fn snapshot(&self) -> ScheduleState {
        lock(&self.state).clone()
    }

    pub fn visible_notice(&self) -> Option<Notice> {
        let now = self.clock.now();
        lock(&self.state).notice.clone().filter(|n| n.is_visible(now))
    }

    fn fail(&self, err: ApiError) -> ApiError {
        error!("Schedule action failed: {}", err);
        lock(&self.state).notice = Some(Notice::from_error(&err, self.clock.now()));
        err
    }

    pub async fn load(&self) -> ApiResult<()> {
        self.fetch().await.map_err(|e| self.fail(e))
    }

    /// Refetch after a booking change that already succeeded.
    async fn refresh(&self) {
        if let Err(e) = self.fetch().await {
            warn!("Schedule refetch after change failed: {}", e);
        }
    }

    async fn fetch(&self) -> ApiResult<()> {
        let ticket = self.generation.begin();
        lock(&self.state).loading = true;
        let result = self.api.list_schedules().await;
        if !self.generation.is_current(ticket) {
            debug!("Dropping superseded schedule list");
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.loading = false;
        state.schedules = result?;
        Ok(())
    }

    pub async fn lab_rooms(&self) -> ApiResult<Vec<String>> {
        let rooms = self.api.list_lab_rooms().await.map_err(|e| self.fail(e))?;
        lock(&self.state).lab_rooms = rooms.clone();
        Ok(rooms)
    }

    pub async fn create(&self, booking: NewSchedule) -> ApiResult<ScheduleEntry> {
        if booking.lab_name.trim().is_empty() {
            return Err(ApiError::validation("Lab name is required"));
        }
        if booking.end_time <= booking.start_time {
            return Err(ApiError::validation("End time must be after start time"));
        }
        let created = self
            .api
            .create_schedule(self.token.as_deref(), &booking)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh().await;
        lock(&self.state).notice = Some(Notice::success(
            format!("Booked {}", created.lab_name),
            self.clock.now(),
        ));
        Ok(created)
    }

    pub async fn delete(&self, schedule_id: i64) -> ApiResult<()> {
        self.api
            .delete_schedule(self.token.as_deref(), schedule_id)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh().await;
        Ok(())
    }
}
