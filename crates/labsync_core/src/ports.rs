//! crates/labsync_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client logic depends on.
//! The HTTP adapter and the durable token file live outside this crate and
//! implement these ports, so every controller can be driven by fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AuthCheck, ChatReply, ChatRequest, College, Department, Experiment, ExperimentUpdate,
    FileUpload, InventoryDraft, InventoryItem, InventoryQuery, IssueReport, LoginResponse,
    ManualSyllabus, NewExperiment, NewSchedule, NewSubject, NewUser, ParsedExperiment,
    ParsedSyllabus, ResourceSuggestion, SaveToCatalog, ScheduleEntry, Subject, SubjectUpdate,
    UnknownRole, UserRecord, UserUpdate,
};

//=========================================================================================
// Error taxonomy
//=========================================================================================

/// Every failure a caller of the API ports can observe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network failure: {0}")]
    Network(String),

    /// The server answered with a non-success status. `detail` is the server's
    /// message when it sent one, otherwise the operation's fallback message.
    #[error("{detail}")]
    Http { status: u16, detail: String },

    /// A success response whose body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// Rejected on the client before any request was made.
    #[error("{0}")]
    Validation(String),

    #[error("Unknown role '{0}'")]
    UnknownRole(String),
}

impl ApiError {
    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            detail: detail.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 or 403: the caller's credentials were missing, expired or insufficient.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unprocessable(&self) -> bool {
        self.status() == Some(422)
    }
}

impl From<UnknownRole> for ApiError {
    fn from(err: UnknownRole) -> Self {
        ApiError::UnknownRole(err.0)
    }
}

/// A convenience type alias for `Result<T, ApiError>`.
pub type ApiResult<T> = Result<T, ApiError>;

/// Acknowledgement bodies (deletes, reports) are passed through untouched.
pub type Ack = serde_json::Value;

//=========================================================================================
// Backend Ports (Traits)
//=========================================================================================
//
// Operations that the backend may protect take `token: Option<&str>`. The port never
// reads the session on its own: callers pass whatever token they hold.

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

    /// Validates a bearer token and returns the user it belongs to.
    async fn check_auth(&self, token: &str) -> ApiResult<AuthCheck>;

    async fn list_users(&self, token: Option<&str>) -> ApiResult<Vec<UserRecord>>;

    async fn create_user(&self, token: Option<&str>, user: &NewUser) -> ApiResult<UserRecord>;

    async fn update_user(
        &self,
        token: Option<&str>,
        user_id: i64,
        update: &UserUpdate,
    ) -> ApiResult<UserRecord>;

    async fn delete_user(&self, token: Option<&str>, user_id: i64) -> ApiResult<Ack>;
}

#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn list_items(&self, query: &InventoryQuery) -> ApiResult<Vec<InventoryItem>>;

    /// Free-text search by name or category. The query is sent as typed.
    async fn search_items(&self, query: &str) -> ApiResult<Vec<InventoryItem>>;

    async fn create_item(
        &self,
        token: Option<&str>,
        draft: &InventoryDraft,
    ) -> ApiResult<InventoryItem>;

    async fn update_item(
        &self,
        token: Option<&str>,
        item_id: i64,
        draft: &InventoryDraft,
    ) -> ApiResult<InventoryItem>;

    async fn delete_item(&self, token: Option<&str>, item_id: i64) -> ApiResult<Ack>;

    async fn report_issue(&self, token: Option<&str>, report: &IssueReport) -> ApiResult<Ack>;
}

#[async_trait]
pub trait ScheduleApi: Send + Sync {
    async fn list_schedules(&self) -> ApiResult<Vec<ScheduleEntry>>;

    async fn create_schedule(
        &self,
        token: Option<&str>,
        schedule: &NewSchedule,
    ) -> ApiResult<ScheduleEntry>;

    async fn delete_schedule(&self, token: Option<&str>, schedule_id: i64) -> ApiResult<Ack>;

    async fn list_lab_rooms(&self) -> ApiResult<Vec<String>>;
}

#[async_trait]
pub trait SyllabusApi: Send + Sync {
    /// Uploads a syllabus PDF and returns the experiments the server extracted.
    async fn upload_syllabus(&self, file: FileUpload) -> ApiResult<ParsedSyllabus>;

    async fn manual_syllabus(&self, request: &ManualSyllabus) -> ApiResult<Vec<ParsedExperiment>>;
}

#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    // --- Colleges ---
    async fn list_colleges(&self) -> ApiResult<Vec<College>>;
    async fn create_college(&self, token: Option<&str>, name: &str) -> ApiResult<College>;
    async fn delete_college(&self, token: Option<&str>, college_id: i64) -> ApiResult<Ack>;

    // --- Departments ---
    async fn list_departments(&self, college_id: Option<i64>) -> ApiResult<Vec<Department>>;
    async fn create_department(
        &self,
        token: Option<&str>,
        name: &str,
        college_id: i64,
    ) -> ApiResult<Department>;
    async fn delete_department(&self, token: Option<&str>, department_id: i64) -> ApiResult<Ack>;

    // --- Subjects ---
    async fn list_subjects(
        &self,
        department_id: Option<i64>,
        semester: Option<u8>,
    ) -> ApiResult<Vec<Subject>>;
    async fn create_subject(&self, token: Option<&str>, subject: &NewSubject) -> ApiResult<Subject>;
    async fn update_subject(
        &self,
        token: Option<&str>,
        subject_id: i64,
        update: &SubjectUpdate,
    ) -> ApiResult<Subject>;
    async fn delete_subject(&self, token: Option<&str>, subject_id: i64) -> ApiResult<Ack>;

    // --- Experiments ---
    async fn list_experiments(
        &self,
        subject_id: Option<i64>,
        department_id: Option<i64>,
        semester: Option<u8>,
    ) -> ApiResult<Vec<Experiment>>;
    async fn create_experiment(
        &self,
        token: Option<&str>,
        experiment: &NewExperiment,
    ) -> ApiResult<Experiment>;
    async fn update_experiment(
        &self,
        token: Option<&str>,
        experiment_id: i64,
        update: &ExperimentUpdate,
    ) -> ApiResult<Experiment>;
    async fn delete_experiment(&self, token: Option<&str>, experiment_id: i64) -> ApiResult<Ack>;

    // --- Bulk operations ---
    async fn save_to_catalog(&self, token: Option<&str>, request: &SaveToCatalog) -> ApiResult<Ack>;
    async fn upload_lab_manual(
        &self,
        token: Option<&str>,
        subject_id: i64,
        file: FileUpload,
    ) -> ApiResult<Ack>;
}

#[async_trait]
pub trait EngagementApi: Send + Sync {
    async fn suggest_resource(
        &self,
        token: Option<&str>,
        suggestion: &ResourceSuggestion,
    ) -> ApiResult<Ack>;
}

//=========================================================================================
// Local Ports
//=========================================================================================

/// Durable storage for the bearer token, surviving a restart of the client.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// Source of wall-clock time for notices and the undo window.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
