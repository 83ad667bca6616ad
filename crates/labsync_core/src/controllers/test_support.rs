//! In-memory backend double shared by the controller tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::clock::ManualClock;
use crate::domain::*;
use crate::ports::*;

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    pub items: Mutex<Vec<InventoryItem>>,
    pub colleges: Mutex<Vec<College>>,
    pub departments: Mutex<Vec<Department>>,
    pub subjects: Mutex<Vec<Subject>>,
    pub experiments: Mutex<Vec<Experiment>>,
    pub schedules: Mutex<Vec<ScheduleEntry>>,
    pub users: Mutex<Vec<UserRecord>>,
    pub saved: Mutex<Vec<SaveToCatalog>>,
    pub parsed: Mutex<ParsedSyllabus>,
    pub chat_reply: Mutex<ChatReply>,
    pub chat_gate: Option<Arc<Notify>>,
    pub search_gate: Option<Arc<Notify>>,
    pub fail_next: Mutex<Option<ApiError>>,
    pub fail_on: Mutex<Option<(String, ApiError)>>,
    next_id: AtomicI64,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_with(&self, err: ApiError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Fails the first later call whose log line starts with `call`.
    pub fn fail_call_with(&self, call: &str, err: ApiError) {
        *self.fail_on.lock().unwrap() = Some((call.to_string(), err));
    }

    fn check(&self) -> ApiResult<()> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        let last = self.calls.lock().unwrap().last().cloned().unwrap_or_default();
        let mut fail_on = self.fail_on.lock().unwrap();
        let matches = fail_on
            .as_ref()
            .map_or(false, |(call, _)| last.starts_with(call.as_str()));
        match fail_on.take() {
            Some((_, err)) if matches => Err(err),
            pending => {
                *fail_on = pending;
                Ok(())
            }
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

pub(crate) fn item(id: i64, name: &str, available: i64) -> InventoryItem {
    InventoryItem {
        id,
        name: name.into(),
        category: "Components".into(),
        total_quantity: available,
        available_quantity: available,
        faulty_quantity: 0,
        location: "Lab 3".into(),
        image_url: None,
        description: None,
        low_stock_threshold: 10,
        college_id: None,
        department_id: None,
        subject: None,
    }
}

pub(crate) fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()))
}

fn ack() -> Ack {
    serde_json::json!({ "ok": true })
}

#[async_trait]
impl InventoryApi for FakeBackend {
    async fn list_items(&self, query: &InventoryQuery) -> ApiResult<Vec<InventoryItem>> {
        self.log(format!(
            "list_items college={:?} department={:?}",
            query.college_id, query.department_id
        ));
        self.check()?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| query.college_id.map_or(true, |c| i.college_id == Some(c)))
            .filter(|i| query.department_id.map_or(true, |d| i.department_id == Some(d)))
            .cloned()
            .collect())
    }

    async fn search_items(&self, query: &str) -> ApiResult<Vec<InventoryItem>> {
        self.log(format!("search_items {query}"));
        if let Some(gate) = &self.search_gate {
            gate.notified().await;
        }
        self.check()?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.name.contains(query) || i.category.contains(query))
            .cloned()
            .collect())
    }

    async fn create_item(&self, _token: Option<&str>, draft: &InventoryDraft) -> ApiResult<InventoryItem> {
        self.log(format!("create_item {}", draft.name));
        self.check()?;
        let mut created = item(self.next_id(), &draft.name, draft.available_quantity);
        created.category = draft.category.clone();
        self.items.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_item(
        &self,
        _token: Option<&str>,
        item_id: i64,
        draft: &InventoryDraft,
    ) -> ApiResult<InventoryItem> {
        self.log(format!("update_item {item_id} {}", draft.name));
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let existing = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| ApiError::http(404, "Item not found"))?;
        existing.name = draft.name.clone();
        existing.available_quantity = draft.available_quantity;
        Ok(existing.clone())
    }

    async fn delete_item(&self, _token: Option<&str>, item_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_item {item_id}"));
        self.check()?;
        self.items.lock().unwrap().retain(|i| i.id != item_id);
        Ok(ack())
    }

    async fn report_issue(&self, _token: Option<&str>, report: &IssueReport) -> ApiResult<Ack> {
        self.log(format!("report_issue {}", report.item_id));
        self.check()?;
        Ok(ack())
    }
}

#[async_trait]
impl CatalogApi for FakeBackend {
    async fn list_colleges(&self) -> ApiResult<Vec<College>> {
        self.log("list_colleges");
        self.check()?;
        Ok(self.colleges.lock().unwrap().clone())
    }

    async fn create_college(&self, _token: Option<&str>, name: &str) -> ApiResult<College> {
        self.log(format!("create_college {name}"));
        self.check()?;
        let college = College {
            id: self.next_id(),
            name: name.into(),
        };
        self.colleges.lock().unwrap().push(college.clone());
        Ok(college)
    }

    async fn delete_college(&self, _token: Option<&str>, college_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_college {college_id}"));
        self.check()?;
        self.colleges.lock().unwrap().retain(|c| c.id != college_id);
        self.departments
            .lock()
            .unwrap()
            .retain(|d| d.college_id != college_id);
        Ok(ack())
    }

    async fn list_departments(&self, college_id: Option<i64>) -> ApiResult<Vec<Department>> {
        self.log(format!("list_departments {college_id:?}"));
        self.check()?;
        Ok(self
            .departments
            .lock()
            .unwrap()
            .iter()
            .filter(|d| college_id.map_or(true, |c| d.college_id == c))
            .cloned()
            .collect())
    }

    async fn create_department(
        &self,
        _token: Option<&str>,
        name: &str,
        college_id: i64,
    ) -> ApiResult<Department> {
        self.log(format!("create_department {name} {college_id}"));
        self.check()?;
        let department = Department {
            id: self.next_id(),
            name: name.into(),
            college_id,
        };
        self.departments.lock().unwrap().push(department.clone());
        Ok(department)
    }

    async fn delete_department(&self, _token: Option<&str>, department_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_department {department_id}"));
        self.check()?;
        self.departments
            .lock()
            .unwrap()
            .retain(|d| d.id != department_id);
        Ok(ack())
    }

    async fn list_subjects(
        &self,
        department_id: Option<i64>,
        semester: Option<u8>,
    ) -> ApiResult<Vec<Subject>> {
        self.log(format!("list_subjects {department_id:?} {semester:?}"));
        self.check()?;
        Ok(self
            .subjects
            .lock()
            .unwrap()
            .iter()
            .filter(|s| department_id.map_or(true, |d| s.department_id == d))
            .filter(|s| semester.map_or(true, |n| s.semester == n))
            .cloned()
            .collect())
    }

    async fn create_subject(&self, _token: Option<&str>, subject: &NewSubject) -> ApiResult<Subject> {
        self.log(format!("create_subject {}", subject.name));
        self.check()?;
        let created = Subject {
            id: self.next_id(),
            name: subject.name.clone(),
            code: subject.code.clone(),
            semester: subject.semester,
            department_id: subject.department_id,
            default_compiler: subject.default_compiler.clone(),
            lab_manual_url: subject.lab_manual_url.clone(),
        };
        self.subjects.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_subject(
        &self,
        _token: Option<&str>,
        subject_id: i64,
        update: &SubjectUpdate,
    ) -> ApiResult<Subject> {
        self.log(format!("update_subject {subject_id}"));
        self.check()?;
        let mut subjects = self.subjects.lock().unwrap();
        let subject = subjects
            .iter_mut()
            .find(|s| s.id == subject_id)
            .ok_or_else(|| ApiError::http(404, "Subject not found"))?;
        if let Some(name) = &update.name {
            subject.name = name.clone();
        }
        Ok(subject.clone())
    }

    async fn delete_subject(&self, _token: Option<&str>, subject_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_subject {subject_id}"));
        self.check()?;
        self.subjects.lock().unwrap().retain(|s| s.id != subject_id);
        Ok(ack())
    }

    async fn list_experiments(
        &self,
        subject_id: Option<i64>,
        _department_id: Option<i64>,
        _semester: Option<u8>,
    ) -> ApiResult<Vec<Experiment>> {
        self.log(format!("list_experiments {subject_id:?}"));
        self.check()?;
        Ok(self
            .experiments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| subject_id.map_or(true, |s| e.subject_id == s))
            .cloned()
            .collect())
    }

    async fn create_experiment(
        &self,
        _token: Option<&str>,
        experiment: &NewExperiment,
    ) -> ApiResult<Experiment> {
        self.log(format!("create_experiment {}", experiment.topic));
        self.check()?;
        let created = Experiment {
            id: self.next_id(),
            subject_id: experiment.subject_id,
            unit: experiment.unit,
            topic: experiment.topic.clone(),
            description: experiment.description.clone(),
            suggested_simulation: experiment.suggested_simulation.clone(),
            simulation_links: experiment.simulation_links.clone(),
        };
        self.experiments.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_experiment(
        &self,
        _token: Option<&str>,
        experiment_id: i64,
        update: &ExperimentUpdate,
    ) -> ApiResult<Experiment> {
        self.log(format!("update_experiment {experiment_id}"));
        self.check()?;
        let mut experiments = self.experiments.lock().unwrap();
        let experiment = experiments
            .iter_mut()
            .find(|e| e.id == experiment_id)
            .ok_or_else(|| ApiError::http(404, "Experiment not found"))?;
        if let Some(topic) = &update.topic {
            experiment.topic = topic.clone();
        }
        Ok(experiment.clone())
    }

    async fn delete_experiment(&self, _token: Option<&str>, experiment_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_experiment {experiment_id}"));
        self.check()?;
        self.experiments
            .lock()
            .unwrap()
            .retain(|e| e.id != experiment_id);
        Ok(ack())
    }

    async fn save_to_catalog(&self, _token: Option<&str>, request: &SaveToCatalog) -> ApiResult<Ack> {
        self.log("save_to_catalog");
        self.check()?;
        self.saved.lock().unwrap().push(request.clone());
        Ok(ack())
    }

    async fn upload_lab_manual(
        &self,
        _token: Option<&str>,
        subject_id: i64,
        file: FileUpload,
    ) -> ApiResult<Ack> {
        self.log(format!("upload_lab_manual {subject_id} {}", file.file_name));
        self.check()?;
        Ok(ack())
    }
}

#[async_trait]
impl ScheduleApi for FakeBackend {
    async fn list_schedules(&self) -> ApiResult<Vec<ScheduleEntry>> {
        self.log("list_schedules");
        self.check()?;
        Ok(self.schedules.lock().unwrap().clone())
    }

    async fn create_schedule(&self, _token: Option<&str>, schedule: &NewSchedule) -> ApiResult<ScheduleEntry> {
        self.log(format!("create_schedule {}", schedule.lab_name));
        self.check()?;
        let entry = ScheduleEntry {
            id: self.next_id(),
            lab_name: schedule.lab_name.clone(),
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            course_name: schedule.course_name.clone(),
            batch: schedule.batch.clone(),
            booked_by_id: schedule.booked_by_id,
            college_id: None,
            department_id: None,
            semester: None,
            subject: None,
            instructor_name: schedule.instructor_name.clone(),
            lab_room: schedule.lab_room.clone(),
        };
        self.schedules.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn delete_schedule(&self, _token: Option<&str>, schedule_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_schedule {schedule_id}"));
        self.check()?;
        self.schedules.lock().unwrap().retain(|s| s.id != schedule_id);
        Ok(ack())
    }

    async fn list_lab_rooms(&self) -> ApiResult<Vec<String>> {
        self.log("list_lab_rooms");
        self.check()?;
        Ok(vec!["Lab 1".into(), "Lab 3".into()])
    }
}

#[async_trait]
impl SyllabusApi for FakeBackend {
    async fn upload_syllabus(&self, file: FileUpload) -> ApiResult<ParsedSyllabus> {
        self.log(format!("upload_syllabus {}", file.file_name));
        self.check()?;
        Ok(self.parsed.lock().unwrap().clone())
    }

    async fn manual_syllabus(&self, request: &ManualSyllabus) -> ApiResult<Vec<ParsedExperiment>> {
        self.log(format!("manual_syllabus {}", request.subject));
        self.check()?;
        Ok(request
            .topics
            .iter()
            .enumerate()
            .map(|(i, topic)| ParsedExperiment {
                subject: None,
                subject_code: None,
                unit: Some(i as u32 + 1),
                topic: topic.clone(),
                description: None,
                suggested_simulation: None,
            })
            .collect())
    }
}

#[async_trait]
impl AssistantApi for FakeBackend {
    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        self.log(format!("chat {}", request.query));
        if let Some(gate) = &self.chat_gate {
            gate.notified().await;
        }
        self.check()?;
        Ok(self.chat_reply.lock().unwrap().clone())
    }
}

#[async_trait]
impl EngagementApi for FakeBackend {
    async fn suggest_resource(
        &self,
        _token: Option<&str>,
        suggestion: &ResourceSuggestion,
    ) -> ApiResult<Ack> {
        self.log(format!("suggest_resource {}", suggestion.tool_name));
        self.check()?;
        Ok(ack())
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn login(&self, _email: &str, _password: &str) -> ApiResult<LoginResponse> {
        Err(ApiError::http(401, "Invalid email or password"))
    }

    async fn check_auth(&self, _token: &str) -> ApiResult<AuthCheck> {
        Ok(AuthCheck {
            authenticated: false,
            user: None,
        })
    }

    async fn list_users(&self, token: Option<&str>) -> ApiResult<Vec<UserRecord>> {
        self.log(format!("list_users {token:?}"));
        self.check()?;
        Ok(self.users.lock().unwrap().clone())
    }

    async fn create_user(&self, token: Option<&str>, user: &NewUser) -> ApiResult<UserRecord> {
        self.log(format!("create_user {} {token:?}", user.email));
        self.check()?;
        let record = UserRecord {
            id: self.next_id(),
            email: user.email.clone(),
            role: user.role.to_string(),
            name: user.name.clone(),
        };
        self.users.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_user(
        &self,
        _token: Option<&str>,
        user_id: i64,
        update: &UserUpdate,
    ) -> ApiResult<UserRecord> {
        self.log(format!("update_user {user_id}"));
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| ApiError::http(404, "User not found"))?;
        if let Some(role) = update.role {
            user.role = role.to_string();
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, _token: Option<&str>, user_id: i64) -> ApiResult<Ack> {
        self.log(format!("delete_user {user_id}"));
        self.check()?;
        self.users.lock().unwrap().retain(|u| u.id != user_id);
        Ok(ack())
    }
}
