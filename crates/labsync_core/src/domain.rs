//! crates/labsync_core/src/domain.rs
//!
//! Defines the records exchanged with the LabSync backend.
//! Every entity here is server-owned; the client only holds copies of them
//! between a fetch and the next refetch.

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Roles and Users
//=========================================================================================

/// A staff or student role. The declaration order is the permission order:
/// a higher role holds every permission of the roles below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Assistant,
    Hod,
    Principal,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Assistant, Role::Hod, Role::Principal];

    /// The integer rank used for access comparisons.
    pub fn level(self) -> u8 {
        match self {
            Role::Student => 0,
            Role::Assistant => 1,
            Role::Hod => 2,
            Role::Principal => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Assistant => "assistant",
            Role::Hod => "hod",
            Role::Principal => "principal",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string falls outside the closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "assistant" => Ok(Role::Assistant),
            "hod" => Ok(Role::Hod),
            "principal" => Ok(Role::Principal),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A user exactly as the backend sends it. The role is still a free string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A user whose role has been checked against [`Role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub name: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = UnknownRole;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let role = record.role.parse::<Role>()?;
        Ok(Self {
            id: record.id,
            email: record.email,
            role,
            name: record.name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub user: UserRecord,
}

/// Response of the token validation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthCheck {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
}

/// Partial user update; unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

//=========================================================================================
// Catalog: College -> Department -> Subject -> Experiment
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct College {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub college_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub semester: u8,
    pub department_id: i64,
    #[serde(default)]
    pub default_compiler: Option<String>,
    #[serde(default)]
    pub lab_manual_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSubject {
    pub name: String,
    pub code: Option<String>,
    pub semester: u8,
    pub department_id: i64,
    pub default_compiler: Option<String>,
    pub lab_manual_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_manual_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationLink {
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: i64,
    pub subject_id: i64,
    #[serde(default)]
    pub unit: Option<u32>,
    pub topic: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suggested_simulation: Option<String>,
    #[serde(default)]
    pub simulation_links: Vec<SimulationLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewExperiment {
    pub subject_id: i64,
    pub unit: Option<u32>,
    pub topic: String,
    pub description: Option<String>,
    pub suggested_simulation: Option<String>,
    pub simulation_links: Vec<SimulationLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExperimentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_simulation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_links: Option<Vec<SimulationLink>>,
}

/// Bulk request that files a parsed syllabus under a college, department and semester.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveToCatalog {
    pub college_id: i64,
    pub department_id: i64,
    pub semester: u8,
    pub subjects: Vec<CatalogSubject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSubject {
    pub subject: String,
    pub subject_code: String,
    pub experiments: Vec<CatalogExperiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogExperiment {
    pub unit: Option<u32>,
    pub topic: String,
    pub description: Option<String>,
    pub suggested_simulation: Option<String>,
}

//=========================================================================================
// Inventory
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub total_quantity: i64,
    #[serde(default)]
    pub available_quantity: i64,
    #[serde(default)]
    pub faulty_quantity: i64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
    #[serde(default)]
    pub college_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub subject: Option<String>,
}

fn default_low_stock_threshold() -> i64 {
    10
}

/// Stock label derived from the quantities of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Available,
    Low,
    OutOfStock,
}

impl StockStatus {
    pub fn label(self) -> &'static str {
        match self {
            StockStatus::Available => "Available",
            StockStatus::Low => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

impl InventoryItem {
    pub fn stock_status(&self) -> StockStatus {
        if self.available_quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.available_quantity <= self.low_stock_threshold {
            StockStatus::Low
        } else {
            StockStatus::Available
        }
    }
}

/// The create/edit form. Submitted whole, never as a diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryDraft {
    pub name: String,
    pub category: String,
    pub total_quantity: i64,
    pub available_quantity: i64,
    pub faulty_quantity: i64,
    pub location: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub low_stock_threshold: i64,
    pub college_id: Option<i64>,
    pub department_id: Option<i64>,
    pub subject: Option<String>,
}

impl Default for InventoryDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            total_quantity: 0,
            available_quantity: 0,
            faulty_quantity: 0,
            location: String::new(),
            image_url: None,
            description: None,
            low_stock_threshold: default_low_stock_threshold(),
            college_id: None,
            department_id: None,
            subject: None,
        }
    }
}

impl From<&InventoryItem> for InventoryDraft {
    fn from(item: &InventoryItem) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            total_quantity: item.total_quantity,
            available_quantity: item.available_quantity,
            faulty_quantity: item.faulty_quantity,
            location: item.location.clone(),
            image_url: item.image_url.clone(),
            description: item.description.clone(),
            low_stock_threshold: item.low_stock_threshold,
            college_id: item.college_id,
            department_id: item.department_id,
            subject: item.subject.clone(),
        }
    }
}

/// Paging and classification filters for the inventory list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryQuery {
    pub skip: u32,
    pub limit: u32,
    pub college_id: Option<i64>,
    pub department_id: Option<i64>,
}

impl Default for InventoryQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            college_id: None,
            department_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Faulty,
    Missing,
}

/// A faulty or missing equipment report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueReport {
    pub item_id: i64,
    pub issue_type: IssueKind,
    pub quantity: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
}

//=========================================================================================
// Schedule
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub lab_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub course_name: String,
    pub batch: String,
    #[serde(default)]
    pub booked_by_id: Option<i64>,
    #[serde(default)]
    pub college_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub semester: Option<u8>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub lab_room: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSchedule {
    pub lab_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub course_name: String,
    pub batch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_by_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_room: Option<String>,
}

//=========================================================================================
// Syllabus mapping and the AI assistant
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedExperiment {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub unit: Option<u32>,
    pub topic: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suggested_simulation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSyllabus {
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub experiments: Vec<ParsedExperiment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualSyllabus {
    pub subject: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub query: String,
    pub context: String,
}

/// The backend answers in `response`; older deployments used `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatReply {
    pub fn text(&self) -> Option<&str> {
        self.response
            .as_deref()
            .filter(|text| !text.is_empty())
            .or_else(|| self.message.as_deref().filter(|text| !text.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSuggestion {
    pub tool_name: String,
    pub description: String,
    pub url: String,
}

/// A file handed to a multipart upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn pdf(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/pdf".to_string(),
            bytes: bytes.into(),
        }
    }
}
