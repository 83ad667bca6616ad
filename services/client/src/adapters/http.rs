//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the LabSync REST backend.
//! One `HttpApi` value implements every backend port from the `core` crate.

use async_trait::async_trait;
use labsync_core::domain::{
    AuthCheck, ChatReply, ChatRequest, College, Department, Experiment, ExperimentUpdate,
    FileUpload, InventoryDraft, InventoryItem, InventoryQuery, IssueReport, LoginResponse,
    ManualSyllabus, NewExperiment, NewSchedule, NewSubject, NewUser, ParsedExperiment,
    ParsedSyllabus, ResourceSuggestion, SaveToCatalog, ScheduleEntry, Subject, SubjectUpdate,
    UserRecord, UserUpdate,
};
use labsync_core::ports::{
    Ack, ApiError, ApiResult, AssistantApi, AuthApi, CatalogApi, EngagementApi, InventoryApi,
    ScheduleApi, SyllabusApi,
};
use reqwest::{multipart, Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to the backend over HTTP with `reqwest`.
///
/// No timeout and no retries are configured; a request that never completes
/// leaves its caller waiting.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: String,
}

impl HttpApi {
    /// Creates a new `HttpApi` against a fixed backend origin.
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Client::builder().build()?, base))
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        debug!(%method, path, authenticated = token.is_some(), "Sending request");
        let builder = self.client.request(method, format!("{}{}", self.base, path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and decodes a success body. Any non-2xx status
    /// becomes `ApiError::Http` carrying the server's `detail` if it sent one,
    /// otherwise `fallback`.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, fallback: &str) -> ApiResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let detail = error_detail(&body).unwrap_or_else(|| fallback.to_string());
            debug!(status = status.as_u16(), %detail, "Request failed");
            return Err(ApiError::http(status.as_u16(), detail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pulls a human-readable `detail` string out of an error body.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .filter(|detail| !detail.is_empty())
        .map(str::to_string)
}

fn file_form(file: FileUpload) -> ApiResult<multipart::Form> {
    let part = multipart::Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name)
        .mime_str(&file.content_type)
        .map_err(|e| ApiError::validation(format!("Invalid content type: {}", e)))?;
    Ok(multipart::Form::new().part("file", part))
}

//=========================================================================================
// `AuthApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let builder = self
            .request(Method::POST, "/auth/login", None)
            .json(&json!({ "email": email, "password": password }));
        self.send(builder, "Login failed").await
    }

    async fn check_auth(&self, token: &str) -> ApiResult<AuthCheck> {
        let builder = self.request(Method::GET, "/auth/check", Some(token));
        self.send(builder, "Authentication check failed").await
    }

    async fn list_users(&self, token: Option<&str>) -> ApiResult<Vec<UserRecord>> {
        let builder = self.request(Method::GET, "/auth/users", token);
        self.send(builder, "Failed to fetch users").await
    }

    async fn create_user(&self, token: Option<&str>, user: &NewUser) -> ApiResult<UserRecord> {
        let builder = self.request(Method::POST, "/auth/register", token).json(user);
        self.send(builder, "Failed to create user").await
    }

    async fn update_user(
        &self,
        token: Option<&str>,
        user_id: i64,
        update: &UserUpdate,
    ) -> ApiResult<UserRecord> {
        let builder = self
            .request(Method::PUT, &format!("/auth/users/{}", user_id), token)
            .json(update);
        self.send(builder, "Failed to update user").await
    }

    async fn delete_user(&self, token: Option<&str>, user_id: i64) -> ApiResult<Ack> {
        let builder = self.request(Method::DELETE, &format!("/auth/users/{}", user_id), token);
        self.send(builder, "Failed to delete user").await
    }
}

//=========================================================================================
// `InventoryApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl InventoryApi for HttpApi {
    async fn list_items(&self, query: &InventoryQuery) -> ApiResult<Vec<InventoryItem>> {
        let mut params = vec![
            ("skip", query.skip.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(college_id) = query.college_id {
            params.push(("college_id", college_id.to_string()));
        }
        if let Some(department_id) = query.department_id {
            params.push(("department_id", department_id.to_string()));
        }
        let builder = self.request(Method::GET, "/inventory/", None).query(&params);
        self.send(builder, "Failed to fetch inventory").await
    }

    async fn search_items(&self, query: &str) -> ApiResult<Vec<InventoryItem>> {
        let builder = self
            .request(Method::GET, "/inventory/search", None)
            .query(&[("q", query)]);
        self.send(builder, "Failed to search inventory").await
    }

    async fn create_item(
        &self,
        token: Option<&str>,
        draft: &InventoryDraft,
    ) -> ApiResult<InventoryItem> {
        let builder = self.request(Method::POST, "/inventory/", token).json(draft);
        self.send(builder, "Failed to create item").await
    }

    async fn update_item(
        &self,
        token: Option<&str>,
        item_id: i64,
        draft: &InventoryDraft,
    ) -> ApiResult<InventoryItem> {
        let builder = self
            .request(Method::PUT, &format!("/inventory/{}", item_id), token)
            .json(draft);
        self.send(builder, "Failed to update item").await
    }

    async fn delete_item(&self, token: Option<&str>, item_id: i64) -> ApiResult<Ack> {
        let builder = self.request(Method::DELETE, &format!("/inventory/{}", item_id), token);
        self.send(builder, "Failed to delete item").await
    }

    async fn report_issue(&self, token: Option<&str>, report: &IssueReport) -> ApiResult<Ack> {
        let builder = self
            .request(Method::POST, "/inventory/report-issue", token)
            .json(report);
        self.send(builder, "Failed to report issue").await
    }
}

//=========================================================================================
// `ScheduleApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl ScheduleApi for HttpApi {
    async fn list_schedules(&self) -> ApiResult<Vec<ScheduleEntry>> {
        let builder = self.request(Method::GET, "/schedule/", None);
        self.send(builder, "Failed to fetch schedules").await
    }

    async fn create_schedule(
        &self,
        token: Option<&str>,
        schedule: &NewSchedule,
    ) -> ApiResult<ScheduleEntry> {
        let builder = self.request(Method::POST, "/schedule/", token).json(schedule);
        self.send(builder, "Failed to create schedule").await
    }

    async fn delete_schedule(&self, token: Option<&str>, schedule_id: i64) -> ApiResult<Ack> {
        let builder = self.request(Method::DELETE, &format!("/schedule/{}", schedule_id), token);
        self.send(builder, "Failed to delete schedule").await
    }

    async fn list_lab_rooms(&self) -> ApiResult<Vec<String>> {
        let builder = self.request(Method::GET, "/schedule/rooms", None);
        self.send(builder, "Failed to fetch lab rooms").await
    }
}

//=========================================================================================
// `SyllabusApi` and `AssistantApi` Trait Implementations
//=========================================================================================

#[async_trait]
impl SyllabusApi for HttpApi {
    async fn upload_syllabus(&self, file: FileUpload) -> ApiResult<ParsedSyllabus> {
        let builder = self
            .request(Method::POST, "/syllabus/upload", None)
            .multipart(file_form(file)?);
        self.send(builder, "Failed to parse syllabus").await
    }

    async fn manual_syllabus(&self, request: &ManualSyllabus) -> ApiResult<Vec<ParsedExperiment>> {
        let builder = self.request(Method::POST, "/syllabus/manual", None).json(request);
        self.send(builder, "Failed to process manual syllabus").await
    }
}

#[async_trait]
impl AssistantApi for HttpApi {
    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        let builder = self.request(Method::POST, "/ai/chat", None).json(request);
        self.send(builder, "Failed to get AI response").await
    }
}

//=========================================================================================
// `CatalogApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogApi for HttpApi {
    async fn list_colleges(&self) -> ApiResult<Vec<College>> {
        let builder = self.request(Method::GET, "/vlabs/colleges", None);
        self.send(builder, "Failed to fetch colleges").await
    }

    async fn create_college(&self, token: Option<&str>, name: &str) -> ApiResult<College> {
        let builder = self
            .request(Method::POST, "/vlabs/colleges", token)
            .json(&json!({ "name": name }));
        self.send(builder, "Failed to create college").await
    }

    async fn delete_college(&self, token: Option<&str>, college_id: i64) -> ApiResult<Ack> {
        let builder = self.request(Method::DELETE, &format!("/vlabs/colleges/{}", college_id), token);
        self.send(builder, "Failed to delete college").await
    }

    async fn list_departments(&self, college_id: Option<i64>) -> ApiResult<Vec<Department>> {
        let mut builder = self.request(Method::GET, "/vlabs/departments", None);
        if let Some(college_id) = college_id {
            builder = builder.query(&[("college_id", college_id)]);
        }
        self.send(builder, "Failed to fetch departments").await
    }

    async fn create_department(
        &self,
        token: Option<&str>,
        name: &str,
        college_id: i64,
    ) -> ApiResult<Department> {
        let builder = self
            .request(Method::POST, "/vlabs/departments", token)
            .json(&json!({ "name": name, "college_id": college_id }));
        self.send(builder, "Failed to create department").await
    }

    async fn delete_department(&self, token: Option<&str>, department_id: i64) -> ApiResult<Ack> {
        let builder = self.request(
            Method::DELETE,
            &format!("/vlabs/departments/{}", department_id),
            token,
        );
        self.send(builder, "Failed to delete department").await
    }

    async fn list_subjects(
        &self,
        department_id: Option<i64>,
        semester: Option<u8>,
    ) -> ApiResult<Vec<Subject>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(department_id) = department_id {
            params.push(("department_id", department_id.to_string()));
        }
        if let Some(semester) = semester {
            params.push(("semester", semester.to_string()));
        }
        let builder = self.request(Method::GET, "/vlabs/subjects", None).query(&params);
        self.send(builder, "Failed to fetch subjects").await
    }

    async fn create_subject(&self, token: Option<&str>, subject: &NewSubject) -> ApiResult<Subject> {
        let builder = self.request(Method::POST, "/vlabs/subjects", token).json(subject);
        self.send(builder, "Failed to create subject").await
    }

    async fn update_subject(
        &self,
        token: Option<&str>,
        subject_id: i64,
        update: &SubjectUpdate,
    ) -> ApiResult<Subject> {
        let builder = self
            .request(Method::PUT, &format!("/vlabs/subjects/{}", subject_id), token)
            .json(update);
        self.send(builder, "Failed to update subject").await
    }

    async fn delete_subject(&self, token: Option<&str>, subject_id: i64) -> ApiResult<Ack> {
        let builder = self.request(Method::DELETE, &format!("/vlabs/subjects/{}", subject_id), token);
        self.send(builder, "Failed to delete subject").await
    }

    async fn list_experiments(
        &self,
        subject_id: Option<i64>,
        department_id: Option<i64>,
        semester: Option<u8>,
    ) -> ApiResult<Vec<Experiment>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(subject_id) = subject_id {
            params.push(("subject_id", subject_id.to_string()));
        }
        if let Some(department_id) = department_id {
            params.push(("department_id", department_id.to_string()));
        }
        if let Some(semester) = semester {
            params.push(("semester", semester.to_string()));
        }
        let builder = self.request(Method::GET, "/vlabs/experiments", None).query(&params);
        self.send(builder, "Failed to fetch experiments").await
    }

    async fn create_experiment(
        &self,
        token: Option<&str>,
        experiment: &NewExperiment,
    ) -> ApiResult<Experiment> {
        let builder = self.request(Method::POST, "/vlabs/experiments", token).json(experiment);
        self.send(builder, "Failed to create experiment").await
    }

    async fn update_experiment(
        &self,
        token: Option<&str>,
        experiment_id: i64,
        update: &ExperimentUpdate,
    ) -> ApiResult<Experiment> {
        let builder = self
            .request(Method::PUT, &format!("/vlabs/experiments/{}", experiment_id), token)
            .json(update);
        self.send(builder, "Failed to update experiment").await
    }

    async fn delete_experiment(&self, token: Option<&str>, experiment_id: i64) -> ApiResult<Ack> {
        let builder = self.request(
            Method::DELETE,
            &format!("/vlabs/experiments/{}", experiment_id),
            token,
        );
        self.send(builder, "Failed to delete experiment").await
    }

    async fn save_to_catalog(&self, token: Option<&str>, request: &SaveToCatalog) -> ApiResult<Ack> {
        let builder = self.request(Method::POST, "/vlabs/save", token).json(request);
        self.send(builder, "Failed to save to VLabs").await
    }

    async fn upload_lab_manual(
        &self,
        token: Option<&str>,
        subject_id: i64,
        file: FileUpload,
    ) -> ApiResult<Ack> {
        let builder = self
            .request(
                Method::POST,
                &format!("/vlabs/subjects/{}/lab-manual", subject_id),
                token,
            )
            .multipart(file_form(file)?);
        self.send(builder, "Failed to upload lab manual").await
    }
}

//=========================================================================================
// `EngagementApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl EngagementApi for HttpApi {
    async fn suggest_resource(
        &self,
        token: Option<&str>,
        suggestion: &ResourceSuggestion,
    ) -> ApiResult<Ack> {
        let builder = self
            .request(Method::POST, "/engagement/resources/suggest", token)
            .json(suggestion);
        self.send(builder, "Failed to submit suggestion").await
    }
}
