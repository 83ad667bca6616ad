//! crates/labsync_core/src/controllers/inventory.rs
//!
//! The inventory page: list, search, college/department classification,
//! the shared create/edit form, confirmed deletes and issue reports.
//! Every mutation is followed by a full refetch under the current filters;
//! nothing is patched into the local list.

use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

use super::lock;
use crate::domain::{
    College, Department, InventoryDraft, InventoryItem, InventoryQuery, IssueReport, StockStatus,
};
use crate::inflight::RequestGeneration;
use crate::notice::Notice;
use crate::ports::{ApiError, ApiResult, CatalogApi, Clock, InventoryApi};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryState {
    pub items: Vec<InventoryItem>,
    pub loading: bool,
    pub search_query: String,
    pub colleges: Vec<College>,
    pub departments: Vec<Department>,
    pub college_id: Option<i64>,
    pub department_id: Option<i64>,
    pub form_open: bool,
    pub draft: InventoryDraft,
    /// The item being edited; `None` while the form creates a new item.
    pub editing: Option<i64>,
    pub submitting: bool,
    /// Item awaiting delete confirmation.
    pub pending_delete: Option<i64>,
    pub notice: Option<Notice>,
}

pub struct InventoryController {
    inventory: Arc<dyn InventoryApi>,
    catalog: Arc<dyn CatalogApi>,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    list_generation: RequestGeneration,
    department_generation: RequestGeneration,
    state: Mutex<InventoryState>,
}

impl InventoryController {
    pub fn new(
        inventory: Arc<dyn InventoryApi>,
        catalog: Arc<dyn CatalogApi>,
        clock: Arc<dyn Clock>,
        token: Option<String>,
    ) -> Self {
        Self {
            inventory,
            catalog,
            clock,
            token,
            list_generation: RequestGeneration::new(),
            department_generation: RequestGeneration::new(),
            state: Mutex::new(InventoryState {
                loading: true,
                ..Default::default()
            }),
        }
    }

    pub fn snapshot(&self) -> InventoryState {
        lock(&self.state).clone()
    }

    /// Items paired with their derived stock label.
    pub fn items_with_status(&self) -> Vec<(InventoryItem, StockStatus)> {
        lock(&self.state)
            .items
            .iter()
            .map(|item| (item.clone(), item.stock_status()))
            .collect()
    }

    pub fn visible_notice(&self) -> Option<Notice> {
        let now = self.clock.now();
        lock(&self.state)
            .notice
            .clone()
            .filter(|notice| notice.is_visible(now))
    }

    fn notify(&self, notice: Notice) {
        lock(&self.state).notice = Some(notice);
    }

    fn fail(&self, err: ApiError) -> ApiError {
        error!("Inventory action failed: {}", err);
        self.notify(Notice::from_error(&err, self.clock.now()));
        err
    }

    //=====================================================================================
    // Listing
    //=====================================================================================

    /// Fetches the unfiltered-by-text list under the current classification filters.
    pub async fn load(&self) -> ApiResult<()> {
        self.fetch_items().await.map_err(|e| self.fail(e))
    }

    /// Refetch after a change that already succeeded; a failure is only logged.
    async fn refresh(&self) {
        if let Err(e) = self.fetch_items().await {
            warn!("Inventory refetch after change failed: {}", e);
        }
    }

    async fn fetch_items(&self) -> ApiResult<()> {
        let query = {
            let state = lock(&self.state);
            InventoryQuery {
                college_id: state.college_id,
                department_id: state.department_id,
                ..Default::default()
            }
        };
        let ticket = self.list_generation.begin();
        lock(&self.state).loading = true;

        let result = self.inventory.list_items(&query).await;
        self.apply_list(ticket, result)
    }

    /// Runs a text search. A blank query reloads the full list instead.
    pub async fn search(&self, query: &str) -> ApiResult<()> {
        lock(&self.state).search_query = query.to_string();
        if query.trim().is_empty() {
            return self.load().await;
        }
        let ticket = self.list_generation.begin();
        lock(&self.state).loading = true;

        let result = self.inventory.search_items(query).await;
        self.apply_list(ticket, result).map_err(|e| self.fail(e))
    }

    fn apply_list(
        &self,
        ticket: crate::inflight::Ticket,
        result: ApiResult<Vec<InventoryItem>>,
    ) -> ApiResult<()> {
        if !self.list_generation.is_current(ticket) {
            debug!("Discarding superseded inventory response");
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.loading = false;
        state.items = result?;
        Ok(())
    }

    pub async fn load_colleges(&self) -> ApiResult<()> {
        let colleges = self.catalog.list_colleges().await.map_err(|e| self.fail(e))?;
        lock(&self.state).colleges = colleges;
        Ok(())
    }

    /// Changes the college filter. The department filter and list are always
    /// reset first; a new department list is fetched only for a chosen college.
    /// Items are refetched under the new filter even when the department list
    /// could not be loaded.
    pub async fn select_college(&self, college_id: Option<i64>) -> ApiResult<()> {
        {
            let mut state = lock(&self.state);
            state.college_id = college_id;
            state.department_id = None;
            state.departments.clear();
        }
        let ticket = self.department_generation.begin();

        let mut departments_loaded = Ok(());
        if let Some(id) = college_id {
            match self.catalog.list_departments(Some(id)).await {
                Ok(departments) if self.department_generation.is_current(ticket) => {
                    lock(&self.state).departments = departments;
                }
                Ok(_) => debug!("Discarding superseded department list"),
                Err(e) => departments_loaded = Err(self.fail(e)),
            }
        }
        let items_loaded = self.load().await;
        departments_loaded.and(items_loaded)
    }

    pub async fn select_department(&self, department_id: Option<i64>) -> ApiResult<()> {
        lock(&self.state).department_id = department_id;
        self.load().await
    }

    //=====================================================================================
    // Create / edit form
    //=====================================================================================

    pub fn begin_create(&self) {
        let mut state = lock(&self.state);
        state.form_open = true;
        state.editing = None;
        state.draft = InventoryDraft::default();
    }

    pub fn begin_edit(&self, item: &InventoryItem) {
        let mut state = lock(&self.state);
        state.form_open = true;
        state.editing = Some(item.id);
        state.draft = InventoryDraft::from(item);
    }

    pub fn update_draft(&self, edit: impl FnOnce(&mut InventoryDraft)) {
        edit(&mut lock(&self.state).draft);
    }

    pub fn close_form(&self) {
        let mut state = lock(&self.state);
        state.form_open = false;
        state.editing = None;
        state.draft = InventoryDraft::default();
    }

    /// Sends the whole draft to create or update, then refetches the list.
    pub async fn submit(&self) -> ApiResult<()> {
        let (draft, editing) = {
            let mut state = lock(&self.state);
            if state.submitting {
                return Err(ApiError::validation("A submission is already in progress"));
            }
            if state.draft.name.trim().is_empty() {
                drop(state);
                return Err(self.fail(ApiError::validation("Item name is required")));
            }
            state.submitting = true;
            (state.draft.clone(), state.editing)
        };

        let token = self.token.as_deref();
        let result = match editing {
            Some(id) => self.inventory.update_item(token, id, &draft).await,
            None => self.inventory.create_item(token, &draft).await,
        };
        lock(&self.state).submitting = false;

        let saved = result.map_err(|e| self.fail(e))?;
        self.close_form();
        let verb = if editing.is_some() { "Updated" } else { "Added" };
        self.notify(Notice::success(
            format!("{} \"{}\"", verb, saved.name),
            self.clock.now(),
        ));
        self.refresh().await;
        Ok(())
    }

    //=====================================================================================
    // Delete with confirmation
    //=====================================================================================

    pub fn request_delete(&self, item_id: i64) {
        lock(&self.state).pending_delete = Some(item_id);
    }

    pub fn cancel_delete(&self) {
        lock(&self.state).pending_delete = None;
    }

    /// Deletes the item awaiting confirmation. Nothing is sent without a prior
    /// [`InventoryController::request_delete`].
    pub async fn confirm_delete(&self) -> ApiResult<()> {
        let item_id = lock(&self.state)
            .pending_delete
            .take()
            .ok_or_else(|| ApiError::validation("No item selected for deletion"))?;

        self.inventory
            .delete_item(self.token.as_deref(), item_id)
            .await
            .map_err(|e| self.fail(e))?;
        self.notify(Notice::success("Item deleted", self.clock.now()));
        self.refresh().await;
        Ok(())
    }

    //=====================================================================================
    // Issue reports
    //=====================================================================================

    /// Reports a faulty or missing item. Anonymous reporters must give a name.
    pub async fn report_issue(&self, report: IssueReport) -> ApiResult<()> {
        let anonymous = self.token.is_none();
        let named = report
            .reporter_name
            .as_deref()
            .map_or(false, |name| !name.trim().is_empty());
        if anonymous && !named {
            return Err(self.fail(ApiError::validation(
                "Name is required for anonymous reports",
            )));
        }
        if report.quantity <= 0 {
            return Err(self.fail(ApiError::validation("Quantity must be at least 1")));
        }

        self.inventory
            .report_issue(self.token.as_deref(), &report)
            .await
            .map_err(|e| self.fail(e))?;
        self.notify(Notice::success("Issue reported. Thank you!", self.clock.now()));
        Ok(())
    }
}
