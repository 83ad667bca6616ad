//! crates/labsync_core/src/controllers/labs.rs
//!
//! The "Labs" tab of the admin dashboard: subjects of one department and
//! semester, the experiments of the expanded subject, and lab manuals.
//! Changes are followed by a refetch of the list they touched.

use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

use super::lock;
use crate::domain::{
    Department, Experiment, ExperimentUpdate, FileUpload, NewExperiment, NewSubject,
    SimulationLink, Subject, SubjectUpdate,
};
use crate::inflight::RequestGeneration;
use crate::notice::Notice;
use crate::ports::{ApiError, ApiResult, CatalogApi, Clock};

/// Source preselected for the first simulation link of a new experiment.
pub const DEFAULT_LINK_SOURCE: &str = "IIT Bombay";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectForm {
    pub name: String,
    pub code: String,
    pub semester: Option<u8>,
    pub default_compiler: String,
}

impl From<&Subject> for SubjectForm {
    fn from(subject: &Subject) -> Self {
        Self {
            name: subject.name.clone(),
            code: subject.code.clone().unwrap_or_default(),
            semester: Some(subject.semester),
            default_compiler: subject.default_compiler.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentForm {
    pub topic: String,
    /// Typed unit number; anything that is not a positive integer is sent as no unit.
    pub unit: String,
    pub description: String,
    pub suggested_simulation: String,
    /// Rows with a blank URL are dropped on save.
    pub links: Vec<SimulationLink>,
}

fn blank_link() -> SimulationLink {
    SimulationLink {
        source: DEFAULT_LINK_SOURCE.to_string(),
        url: String::new(),
        description: None,
    }
}

impl Default for ExperimentForm {
    fn default() -> Self {
        Self {
            topic: String::new(),
            unit: String::new(),
            description: String::new(),
            suggested_simulation: String::new(),
            links: vec![blank_link()],
        }
    }
}

impl From<&Experiment> for ExperimentForm {
    fn from(experiment: &Experiment) -> Self {
        let links = if experiment.simulation_links.is_empty() {
            vec![blank_link()]
        } else {
            experiment.simulation_links.clone()
        };
        Self {
            topic: experiment.topic.clone(),
            unit: experiment.unit.map(|u| u.to_string()).unwrap_or_default(),
            description: experiment.description.clone().unwrap_or_default(),
            suggested_simulation: experiment.suggested_simulation.clone().unwrap_or_default(),
            links,
        }
    }
}

/// What the open experiment form will write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentTarget {
    New { subject_id: i64 },
    Edit { experiment_id: i64, subject_id: i64 },
}

impl ExperimentTarget {
    pub fn subject_id(self) -> i64 {
        match self {
            ExperimentTarget::New { subject_id } | ExperimentTarget::Edit { subject_id, .. } => {
                subject_id
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabsState {
    pub college_id: Option<i64>,
    pub department_id: Option<i64>,
    pub semester: Option<u8>,

    pub subjects: Vec<Subject>,
    pub loading_subjects: bool,
    pub subject_form: Option<SubjectForm>,
    /// The subject the form updates; `None` while it creates one.
    pub editing_subject: Option<i64>,

    pub expanded_subject: Option<i64>,
    pub experiments: Vec<Experiment>,
    pub loading_experiments: bool,
    pub experiment_form: Option<ExperimentForm>,
    pub experiment_target: Option<ExperimentTarget>,

    pub notice: Option<Notice>,
}

pub struct LabsController {
    api: Arc<dyn CatalogApi>,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    subjects_gen: RequestGeneration,
    experiments_gen: RequestGeneration,
    state: Mutex<LabsState>,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl LabsController {
    pub fn new(api: Arc<dyn CatalogApi>, clock: Arc<dyn Clock>, token: Option<String>) -> Self {
        Self {
            api,
            clock,
            token,
            subjects_gen: RequestGeneration::new(),
            experiments_gen: RequestGeneration::new(),
            state: Mutex::new(LabsState::default()),
        }
    }

    pub fn snapshot(&self) -> LabsState {
        lock(&self.state).clone()
    }

    pub fn visible_notice(&self) -> Option<Notice> {
        let now = self.clock.now();
        lock(&self.state).notice.clone().filter(|n| n.is_visible(now))
    }

    fn succeed(&self, text: impl Into<String>) {
        lock(&self.state).notice = Some(Notice::success(text, self.clock.now()));
    }

    fn fail(&self, err: ApiError) -> ApiError {
        error!("Labs action failed: {}", err);
        lock(&self.state).notice = Some(Notice::from_error(&err, self.clock.now()));
        err
    }

    //=====================================================================================
    // Filters
    //=====================================================================================

    /// The departments of the selected college, out of a list the dashboard already holds.
    pub fn departments_in<'a>(&self, departments: &'a [Department]) -> Vec<&'a Department> {
        let college_id = lock(&self.state).college_id;
        departments
            .iter()
            .filter(|d| Some(d.college_id) == college_id)
            .collect()
    }

    /// Picking a college drops the department and everything listed under it.
    pub fn select_college(&self, college_id: Option<i64>) {
        self.subjects_gen.begin();
        self.experiments_gen.begin();
        let mut state = lock(&self.state);
        state.college_id = college_id;
        state.department_id = None;
        state.subjects.clear();
        state.loading_subjects = false;
        state.expanded_subject = None;
        state.experiments.clear();
        state.loading_experiments = false;
    }

    pub async fn select_department(&self, department_id: Option<i64>) -> ApiResult<()> {
        {
            let mut state = lock(&self.state);
            state.department_id = department_id;
            state.expanded_subject = None;
            state.experiments.clear();
        }
        self.load_subjects().await
    }

    pub async fn select_semester(&self, semester: Option<u8>) -> ApiResult<()> {
        {
            let mut state = lock(&self.state);
            state.semester = semester;
            state.expanded_subject = None;
            state.experiments.clear();
        }
        self.load_subjects().await
    }

    //=====================================================================================
    // Subjects
    //=====================================================================================

    /// Lists the subjects of the chosen department and semester. With either
    /// filter missing the list is simply emptied.
    pub async fn load_subjects(&self) -> ApiResult<()> {
        self.fetch_subjects().await.map_err(|e| {
            error!("Failed to load subjects: {}", e);
            lock(&self.state).notice = Some(Notice::error("Failed to load subjects", self.clock.now()));
            e
        })
    }

    async fn refresh_subjects(&self) {
        if let Err(e) = self.fetch_subjects().await {
            warn!("Subject refetch after change failed: {}", e);
        }
    }

    async fn fetch_subjects(&self) -> ApiResult<()> {
        let ticket = self.subjects_gen.begin();
        let filter = {
            let mut state = lock(&self.state);
            let filter = state.department_id.zip(state.semester);
            state.loading_subjects = filter.is_some();
            if filter.is_none() {
                state.subjects.clear();
            }
            filter
        };
        let Some((department_id, semester)) = filter else {
            return Ok(());
        };

        let result = self
            .api
            .list_subjects(Some(department_id), Some(semester))
            .await;
        if !self.subjects_gen.is_current(ticket) {
            debug!("Dropping superseded subject list");
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.loading_subjects = false;
        state.subjects = result?;
        Ok(())
    }

    /// Opens an empty subject form preset to the selected semester.
    pub fn begin_add_subject(&self) {
        let mut state = lock(&self.state);
        state.subject_form = Some(SubjectForm {
            semester: state.semester,
            ..SubjectForm::default()
        });
        state.editing_subject = None;
    }

    pub fn begin_edit_subject(&self, subject: &Subject) {
        let mut state = lock(&self.state);
        state.subject_form = Some(SubjectForm::from(subject));
        state.editing_subject = Some(subject.id);
    }

    pub fn update_subject_form(&self, edit: impl FnOnce(&mut SubjectForm)) {
        if let Some(form) = lock(&self.state).subject_form.as_mut() {
            edit(form);
        }
    }

    pub fn cancel_subject_form(&self) {
        let mut state = lock(&self.state);
        state.subject_form = None;
        state.editing_subject = None;
    }

    /// Creates or updates the subject in the open form under the selected department.
    pub async fn save_subject(&self) -> ApiResult<Subject> {
        let (form, editing, department_id) = {
            let state = lock(&self.state);
            (state.subject_form.clone(), state.editing_subject, state.department_id)
        };
        let form = form.ok_or_else(|| ApiError::validation("No subject form is open"))?;
        let name = form.name.trim();
        let semester = match form.semester {
            Some(semester) if !name.is_empty() => semester,
            _ => {
                return Err(self.fail(ApiError::validation(
                    "Subject name and semester are required",
                )))
            }
        };
        let department_id = department_id
            .ok_or_else(|| self.fail(ApiError::validation("Please select a department")))?;

        let token = self.token.as_deref();
        let result = match editing {
            Some(subject_id) => {
                let update = SubjectUpdate {
                    name: Some(name.to_string()),
                    code: Some(form.code.trim().to_string()),
                    semester: Some(semester),
                    default_compiler: Some(form.default_compiler.trim().to_string()),
                    lab_manual_url: None,
                };
                self.api.update_subject(token, subject_id, &update).await
            }
            None => {
                let subject = NewSubject {
                    name: name.to_string(),
                    code: non_blank(&form.code),
                    semester,
                    department_id,
                    default_compiler: non_blank(&form.default_compiler),
                    lab_manual_url: None,
                };
                self.api.create_subject(token, &subject).await
            }
        };
        let saved = result.map_err(|e| self.fail(e))?;

        self.cancel_subject_form();
        self.refresh_subjects().await;
        self.succeed(if editing.is_some() {
            "Subject updated"
        } else {
            "Subject created"
        });
        Ok(saved)
    }

    /// Deletes a subject; the backend drops its experiments with it.
    pub async fn delete_subject(&self, subject_id: i64) -> ApiResult<()> {
        self.api
            .delete_subject(self.token.as_deref(), subject_id)
            .await
            .map_err(|e| self.fail(e))?;
        {
            let mut state = lock(&self.state);
            if state.expanded_subject == Some(subject_id) {
                self.experiments_gen.begin();
                state.expanded_subject = None;
                state.experiments.clear();
                state.loading_experiments = false;
            }
        }
        self.refresh_subjects().await;
        self.succeed("Subject deleted");
        Ok(())
    }

    pub async fn upload_lab_manual(&self, subject_id: i64, file: FileUpload) -> ApiResult<()> {
        if file.bytes.is_empty() {
            return Err(self.fail(ApiError::validation(
                "Please choose a lab manual to upload.",
            )));
        }
        self.api
            .upload_lab_manual(self.token.as_deref(), subject_id, file)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh_subjects().await;
        self.succeed("Lab manual uploaded");
        Ok(())
    }

    //=====================================================================================
    // Experiments
    //=====================================================================================

    /// Expands a subject and lists its experiments, or collapses it when it
    /// is already the expanded one.
    pub async fn toggle_subject(&self, subject_id: i64) -> ApiResult<()> {
        let expanded = {
            let mut state = lock(&self.state);
            state.experiments.clear();
            if state.expanded_subject == Some(subject_id) {
                state.expanded_subject = None;
                state.loading_experiments = false;
                false
            } else {
                state.expanded_subject = Some(subject_id);
                true
            }
        };
        if !expanded {
            self.experiments_gen.begin();
            return Ok(());
        }
        self.load_experiments().await
    }

    pub async fn load_experiments(&self) -> ApiResult<()> {
        self.fetch_experiments().await.map_err(|e| {
            error!("Failed to load experiments: {}", e);
            lock(&self.state).notice =
                Some(Notice::error("Failed to load experiments", self.clock.now()));
            e
        })
    }

    async fn refresh_experiments(&self) {
        if let Err(e) = self.fetch_experiments().await {
            warn!("Experiment refetch after change failed: {}", e);
        }
    }

    async fn fetch_experiments(&self) -> ApiResult<()> {
        let ticket = self.experiments_gen.begin();
        let subject_id = {
            let mut state = lock(&self.state);
            state.loading_experiments = state.expanded_subject.is_some();
            state.expanded_subject
        };
        let Some(subject_id) = subject_id else {
            return Ok(());
        };

        let result = self.api.list_experiments(Some(subject_id), None, None).await;
        if !self.experiments_gen.is_current(ticket) {
            debug!("Dropping superseded experiment list");
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.loading_experiments = false;
        state.experiments = result?;
        Ok(())
    }

    /// Opens the experiment form: prefilled from `existing`, or empty for a
    /// new experiment under `subject_id`.
    pub fn open_experiment_form(&self, subject_id: i64, existing: Option<&Experiment>) {
        let (form, target) = match existing {
            Some(experiment) => (
                ExperimentForm::from(experiment),
                ExperimentTarget::Edit {
                    experiment_id: experiment.id,
                    subject_id: experiment.subject_id,
                },
            ),
            None => (ExperimentForm::default(), ExperimentTarget::New { subject_id }),
        };
        let mut state = lock(&self.state);
        state.experiment_form = Some(form);
        state.experiment_target = Some(target);
    }

    pub fn update_experiment_form(&self, edit: impl FnOnce(&mut ExperimentForm)) {
        if let Some(form) = lock(&self.state).experiment_form.as_mut() {
            edit(form);
        }
    }

    pub fn cancel_experiment_form(&self) {
        let mut state = lock(&self.state);
        state.experiment_form = None;
        state.experiment_target = None;
    }

    pub async fn save_experiment(&self) -> ApiResult<Experiment> {
        let (form, target) = {
            let state = lock(&self.state);
            (state.experiment_form.clone(), state.experiment_target)
        };
        let (Some(form), Some(target)) = (form, target) else {
            return Err(ApiError::validation("No experiment form is open"));
        };
        let topic = form.topic.trim().to_string();
        if topic.is_empty() {
            return Err(self.fail(ApiError::validation("Experiment topic is required")));
        }
        let unit = form.unit.trim().parse::<u32>().ok().filter(|unit| *unit > 0);
        let links: Vec<SimulationLink> = form
            .links
            .into_iter()
            .filter(|link| !link.url.trim().is_empty())
            .collect();

        let token = self.token.as_deref();
        let result = match target {
            ExperimentTarget::Edit { experiment_id, .. } => {
                let update = ExperimentUpdate {
                    topic: Some(topic),
                    unit,
                    description: Some(form.description.trim().to_string()),
                    suggested_simulation: Some(form.suggested_simulation.trim().to_string()),
                    simulation_links: Some(links),
                };
                self.api.update_experiment(token, experiment_id, &update).await
            }
            ExperimentTarget::New { subject_id } => {
                let experiment = NewExperiment {
                    subject_id,
                    unit,
                    topic,
                    description: non_blank(&form.description),
                    suggested_simulation: non_blank(&form.suggested_simulation),
                    simulation_links: links,
                };
                self.api.create_experiment(token, &experiment).await
            }
        };
        let saved = result.map_err(|e| self.fail(e))?;

        self.cancel_experiment_form();
        let expanded = lock(&self.state).expanded_subject;
        if expanded == Some(target.subject_id()) {
            self.refresh_experiments().await;
        }
        self.succeed(match target {
            ExperimentTarget::Edit { .. } => "Experiment updated",
            ExperimentTarget::New { .. } => "Experiment created",
        });
        Ok(saved)
    }

    pub async fn delete_experiment(&self, experiment_id: i64) -> ApiResult<()> {
        self.api
            .delete_experiment(self.token.as_deref(), experiment_id)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh_experiments().await;
        self.succeed("Experiment deleted");
        Ok(())
    }
}
