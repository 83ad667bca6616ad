//! crates/labsync_core/src/controllers/admin.rs
//!
//! The administrative back office: catalog counts, colleges and departments
//! with time-boxed undo, and staff accounts.

use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use super::lock;
use crate::domain::{College, Department, NewUser, UserRecord, UserUpdate};
use crate::notice::Notice;
use crate::ports::{ApiError, ApiResult, AuthApi, CatalogApi, Clock};
use crate::undo::{DeletedEntry, DeletedItem, DeletedItemBuffer, UNDO_OFFERED};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub colleges: usize,
    pub departments: usize,
    pub subjects: usize,
    pub experiments: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminState {
    pub colleges: Vec<College>,
    pub departments: Vec<Department>,
    pub stats: CatalogStats,
    pub users: Vec<UserRecord>,
    pub loading: bool,
    pub notice: Option<Notice>,
}

pub struct AdminController {
    catalog: Arc<dyn CatalogApi>,
    auth: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    state: Mutex<AdminState>,
    deleted: Mutex<DeletedItemBuffer>,
}

impl AdminController {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        auth: Arc<dyn AuthApi>,
        clock: Arc<dyn Clock>,
        token: Option<String>,
    ) -> Self {
        Self {
            catalog,
            auth,
            clock,
            token,
            state: Mutex::new(AdminState::default()),
            deleted: Mutex::new(DeletedItemBuffer::new()),
        }
    }

    pub fn snapshot(&self) -> AdminState {
        lock(&self.state).clone()
    }

    pub fn visible_notice(&self) -> Option<Notice> {
        let now = self.clock.now();
        lock(&self.state)
            .notice
            .clone()
            .filter(|notice| notice.is_visible(now))
    }

    fn succeed(&self, text: impl Into<String>) {
        lock(&self.state).notice = Some(Notice::success(text, self.clock.now()));
    }

    fn fail(&self, err: ApiError) -> ApiError {
        error!("Admin action failed: {}", err);
        lock(&self.state).notice = Some(Notice::from_error(&err, self.clock.now()));
        err
    }

    /// Refreshes colleges, departments and the catalog counts.
    pub async fn load(&self) -> ApiResult<()> {
        lock(&self.state).loading = true;
        let result = self.fetch_catalog().await;
        lock(&self.state).loading = false;
        result.map_err(|e| self.fail(e))
    }

    /// Refetch after a change that already succeeded. A failure here is logged
    /// and never turns the change itself into an error.
    async fn refresh(&self) {
        lock(&self.state).loading = true;
        let result = self.fetch_catalog().await;
        lock(&self.state).loading = false;
        if let Err(e) = result {
            warn!("Refetch after admin change failed: {}", e);
        }
    }

    async fn fetch_catalog(&self) -> ApiResult<()> {
        let (colleges, departments) = futures::try_join!(
            self.catalog.list_colleges(),
            self.catalog.list_departments(None)
        )?;
        let experiments = self.catalog.list_experiments(None, None, None).await?;
        let subjects = self.catalog.list_subjects(None, None).await?;

        let mut state = lock(&self.state);
        state.stats = CatalogStats {
            colleges: colleges.len(),
            departments: departments.len(),
            subjects: subjects.len(),
            experiments: experiments.len(),
        };
        state.colleges = colleges;
        state.departments = departments;
        Ok(())
    }

    //=====================================================================================
    // Colleges and departments
    //=====================================================================================

    pub async fn add_college(&self, name: &str) -> ApiResult<College> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("College name is required"));
        }
        let college = self
            .catalog
            .create_college(self.token.as_deref(), name)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh().await;
        self.succeed("College added successfully!");
        Ok(college)
    }

    pub async fn add_department(&self, name: &str, college_id: Option<i64>) -> ApiResult<Department> {
        let name = name.trim();
        let college_id = match college_id {
            Some(id) if !name.is_empty() => id,
            _ => {
                return Err(ApiError::validation(
                    "Department name and college are required",
                ))
            }
        };
        let department = self
            .catalog
            .create_department(self.token.as_deref(), name, college_id)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh().await;
        self.succeed("Department added successfully!");
        Ok(department)
    }

    /// Deletes a college and remembers it for undo. Returns the undo handle.
    pub async fn delete_college(&self, college: &College) -> ApiResult<u64> {
        self.catalog
            .delete_college(self.token.as_deref(), college.id)
            .await
            .map_err(|e| self.fail(e))?;
        let handle = lock(&self.deleted).record(DeletedItem::College(college.clone()), self.clock.now());
        self.refresh().await;
        self.succeed(format!("Deleted \"{}\". Click Undo to restore.", college.name));
        Ok(handle)
    }

    /// Deletes a department and remembers it, with its parent college's name, for undo.
    pub async fn delete_department(&self, department: &Department) -> ApiResult<u64> {
        self.catalog
            .delete_department(self.token.as_deref(), department.id)
            .await
            .map_err(|e| self.fail(e))?;
        let college_name = lock(&self.state)
            .colleges
            .iter()
            .find(|c| c.id == department.college_id)
            .map(|c| c.name.clone());
        let handle = lock(&self.deleted).record(
            DeletedItem::Department {
                department: department.clone(),
                college_name,
            },
            self.clock.now(),
        );
        self.refresh().await;
        self.succeed(format!("Deleted \"{}\". Click Undo to restore.", department.name));
        Ok(handle)
    }

    /// Deletions still offered for undo, newest last.
    pub fn pending_undo(&self) -> Vec<DeletedEntry> {
        lock(&self.deleted)
            .latest(self.clock.now(), UNDO_OFFERED)
            .to_vec()
    }

    /// Drops deletions older than the undo window.
    pub fn prune_expired(&self) -> usize {
        lock(&self.deleted).prune(self.clock.now())
    }

    /// Re-creates a deleted record with a fresh create call.
    ///
    /// A department is re-attached to the college that currently carries the
    /// remembered name; when no such college exists the entry is dropped and an
    /// error returned. If the create call itself fails the entry stays
    /// available for another attempt.
    pub async fn undo(&self, handle: u64) -> ApiResult<()> {
        let now = self.clock.now();
        let entry = lock(&self.deleted)
            .get(handle, now)
            .cloned()
            .ok_or_else(|| ApiError::validation("Nothing to undo: the entry has expired"))?;

        let token = self.token.as_deref();
        let restored = match &entry.item {
            DeletedItem::College(college) => self
                .catalog
                .create_college(token, &college.name)
                .await
                .map(|_| ()),
            DeletedItem::Department {
                department,
                college_name,
            } => {
                let parent = college_name.as_ref().and_then(|name| {
                    lock(&self.state)
                        .colleges
                        .iter()
                        .find(|c| &c.name == name)
                        .map(|c| c.id)
                });
                match parent {
                    Some(college_id) => self
                        .catalog
                        .create_department(token, &department.name, college_id)
                        .await
                        .map(|_| ()),
                    None => {
                        lock(&self.deleted).take(handle, now);
                        return Err(self.fail(ApiError::validation(
                            "Cannot restore: Parent college not found",
                        )));
                    }
                }
            }
        };
        restored.map_err(|e| self.fail(e))?;

        lock(&self.deleted).take(handle, now);
        info!(kind = entry.item.kind(), name = entry.item.name(), "Restored deleted record");
        self.refresh().await;
        self.succeed(format!("Restored \"{}\"!", entry.item.name()));
        Ok(())
    }

    //=====================================================================================
    // Staff accounts
    //=====================================================================================

    pub async fn load_users(&self) -> ApiResult<()> {
        let users = self
            .auth
            .list_users(self.token.as_deref())
            .await
            .map_err(|e| self.fail(e))?;
        lock(&self.state).users = users;
        Ok(())
    }

    async fn refresh_users(&self) {
        match self.auth.list_users(self.token.as_deref()).await {
            Ok(users) => lock(&self.state).users = users,
            Err(e) => warn!("Refetch of users failed: {}", e),
        }
    }

    pub async fn create_user(&self, user: NewUser) -> ApiResult<UserRecord> {
        if user.email.trim().is_empty() || user.password.is_empty() {
            return Err(ApiError::validation("Email and password are required"));
        }
        let created = self
            .auth
            .create_user(self.token.as_deref(), &user)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh_users().await;
        self.succeed(format!("User {} created", created.email));
        Ok(created)
    }

    pub async fn update_user(&self, user_id: i64, update: UserUpdate) -> ApiResult<UserRecord> {
        let updated = self
            .auth
            .update_user(self.token.as_deref(), user_id, &update)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh_users().await;
        self.succeed("User updated");
        Ok(updated)
    }

    pub async fn delete_user(&self, user_id: i64) -> ApiResult<()> {
        self.auth
            .delete_user(self.token.as_deref(), user_id)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh_users().await;
        self.succeed("User deleted");
        Ok(())
    }
}
