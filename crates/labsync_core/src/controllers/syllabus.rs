//! crates/labsync_core/src/controllers/syllabus.rs
//!
//! The syllabus mapper: a parsed syllabus (from an uploaded PDF or a typed
//! topic list) is filtered, grouped for display and optionally filed into the
//! Virtual Labs catalog.

use std::sync::{Arc, Mutex};
use tracing::{error, info};

use super::lock;
use crate::domain::{
    CatalogExperiment, CatalogSubject, FileUpload, ManualSyllabus, ParsedExperiment,
    ParsedSyllabus, SaveToCatalog,
};
use crate::notice::Notice;
use crate::ports::{ApiError, ApiResult, CatalogApi, Clock, SyllabusApi};

const UNKNOWN_SUBJECT: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyllabusState {
    pub syllabus: Option<ParsedSyllabus>,
    pub loading: bool,
    pub error: Option<String>,
    /// `None` shows every subject.
    pub subject_filter: Option<String>,
    /// `None` shows every unit.
    pub unit_filter: Option<u32>,
    pub saving: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGroup {
    /// "Unit N", or "Other" for experiments without a unit.
    pub label: String,
    pub experiments: Vec<ParsedExperiment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup {
    pub subject: String,
    pub units: Vec<UnitGroup>,
}

pub struct SyllabusController {
    syllabus: Arc<dyn SyllabusApi>,
    catalog: Arc<dyn CatalogApi>,
    clock: Arc<dyn Clock>,
    token: Option<String>,
    state: Mutex<SyllabusState>,
}

impl SyllabusController {
    pub fn new(
        syllabus: Arc<dyn SyllabusApi>,
        catalog: Arc<dyn CatalogApi>,
        clock: Arc<dyn Clock>,
        token: Option<String>,
    ) -> Self {
        Self {
            syllabus,
            catalog,
            clock,
            token,
            state: Mutex::new(SyllabusState::default()),
        }
    }

    pub fn snapshot(&self) -> SyllabusState {
        lock(&self.state).clone()
    }

    fn begin(&self) {
        let mut state = lock(&self.state);
        state.loading = true;
        state.error = None;
    }

    fn finish(&self, result: ApiResult<ParsedSyllabus>) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(parsed) => {
                info!(experiments = parsed.experiments.len(), "Syllabus parsed");
                state.syllabus = Some(parsed);
                state.subject_filter = None;
                state.unit_filter = None;
                Ok(())
            }
            Err(err) => {
                error!("Syllabus parsing failed: {}", err);
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Sends a syllabus PDF to the parser.
    pub async fn upload(&self, file: FileUpload) -> ApiResult<()> {
        if file.bytes.is_empty() {
            return Err(ApiError::validation("Please choose a syllabus file to upload."));
        }
        self.begin();
        let result = self.syllabus.upload_syllabus(file).await;
        self.finish(result)
    }

    /// Maps typed topics to experiments. Blank topics are dropped first.
    pub async fn submit_manual(&self, subject: &str, topics: &[String]) -> ApiResult<()> {
        let topics: Vec<String> = topics
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        if topics.is_empty() {
            let err = ApiError::validation("Please enter at least one topic.");
            lock(&self.state).error = Some(err.to_string());
            return Err(err);
        }

        self.begin();
        let request = ManualSyllabus {
            subject: subject.to_string(),
            topics,
        };
        let result = self
            .syllabus
            .manual_syllabus(&request)
            .await
            .map(|experiments| ParsedSyllabus {
                branch: String::new(),
                experiments: experiments
                    .into_iter()
                    .map(|exp| ParsedExperiment {
                        subject: Some(subject.to_string()),
                        subject_code: Some(String::new()),
                        ..exp
                    })
                    .collect(),
            });
        self.finish(result)
    }

    pub fn set_subject_filter(&self, subject: Option<String>) {
        lock(&self.state).subject_filter = subject;
    }

    pub fn set_unit_filter(&self, unit: Option<u32>) {
        lock(&self.state).unit_filter = unit;
    }

    fn experiments(&self) -> Vec<ParsedExperiment> {
        lock(&self.state)
            .syllabus
            .as_ref()
            .map(|s| s.experiments.clone())
            .unwrap_or_default()
    }

    /// Distinct (name, code) pairs in first-seen order. Experiments without a
    /// subject are skipped.
    pub fn unique_subjects(&self) -> Vec<(String, Option<String>)> {
        let mut seen: Vec<(String, Option<String>)> = Vec::new();
        for exp in self.experiments() {
            if let Some(name) = exp.subject {
                let pair = (name, exp.subject_code);
                if !seen.contains(&pair) {
                    seen.push(pair);
                }
            }
        }
        seen
    }

    pub fn unique_units(&self) -> Vec<u32> {
        let mut units: Vec<u32> = self.experiments().iter().filter_map(|e| e.unit).collect();
        units.sort_unstable();
        units.dedup();
        units
    }

    pub fn filtered(&self) -> Vec<ParsedExperiment> {
        let (subject, unit) = {
            let state = lock(&self.state);
            (state.subject_filter.clone(), state.unit_filter)
        };
        self.experiments()
            .into_iter()
            .filter(|e| subject.is_none() || e.subject == subject)
            .filter(|e| unit.is_none() || e.unit == unit)
            .collect()
    }

    /// The filtered experiments grouped subject -> unit, both in first-seen order.
    pub fn grouped(&self) -> Vec<SubjectGroup> {
        let mut groups: Vec<SubjectGroup> = Vec::new();
        for exp in self.filtered() {
            let subject = exp.subject.clone().unwrap_or_else(|| UNKNOWN_SUBJECT.to_string());
            let label = match exp.unit {
                Some(unit) => format!("Unit {unit}"),
                None => "Other".to_string(),
            };

            let index = match groups.iter().position(|g| g.subject == subject) {
                Some(index) => index,
                None => {
                    groups.push(SubjectGroup {
                        subject,
                        units: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];
            match group.units.iter_mut().find(|u| u.label == label) {
                Some(unit) => unit.experiments.push(exp),
                None => group.units.push(UnitGroup {
                    label,
                    experiments: vec![exp],
                }),
            }
        }
        groups
    }

    /// Files every parsed experiment (not just the filtered ones) under a
    /// college, department and semester.
    pub async fn save_to_catalog(
        &self,
        college_id: Option<i64>,
        department_id: Option<i64>,
        semester: Option<u8>,
    ) -> ApiResult<()> {
        let (college_id, department_id, semester) = match (college_id, department_id, semester) {
            (Some(c), Some(d), Some(s)) => (c, d, s),
            _ => {
                return Err(ApiError::validation(
                    "Please select college, department, and semester",
                ))
            }
        };
        let experiments = self.experiments();
        if experiments.is_empty() {
            return Err(ApiError::validation("There are no experiments to save"));
        }

        let request = SaveToCatalog {
            college_id,
            department_id,
            semester,
            subjects: catalog_subjects(experiments),
        };
        lock(&self.state).saving = true;
        let result = self
            .catalog
            .save_to_catalog(self.token.as_deref(), &request)
            .await;

        let now = self.clock.now();
        let mut state = lock(&self.state);
        state.saving = false;
        match result {
            Ok(_) => {
                info!(subjects = request.subjects.len(), "Syllabus saved to catalog");
                state.notice = Some(Notice::success("Saved to Virtual Labs", now));
                Ok(())
            }
            Err(err) => {
                error!("Saving syllabus failed: {}", err);
                state.notice = Some(Notice::from_error(&err, now));
                Err(err)
            }
        }
    }
}

/// Groups experiments by subject name for the bulk save. The first experiment
/// seen for a subject supplies its code.
fn catalog_subjects(experiments: Vec<ParsedExperiment>) -> Vec<CatalogSubject> {
    let mut subjects: Vec<CatalogSubject> = Vec::new();
    for exp in experiments {
        let name = exp.subject.unwrap_or_else(|| UNKNOWN_SUBJECT.to_string());
        let entry = CatalogExperiment {
            unit: exp.unit,
            topic: exp.topic,
            description: exp.description,
            suggested_simulation: exp.suggested_simulation,
        };
        match subjects.iter_mut().find(|s| s.subject == name) {
            Some(subject) => subject.experiments.push(entry),
            None => subjects.push(CatalogSubject {
                subject: name,
                subject_code: exp.subject_code.unwrap_or_default(),
                experiments: vec![entry],
            }),
        }
    }
    subjects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{clock, FakeBackend};

    fn exp(subject: Option<&str>, unit: Option<u32>, topic: &str) -> ParsedExperiment {
        ParsedExperiment {
            subject: subject.map(str::to_string),
            subject_code: subject.map(|s| format!("{}-1", &s[..2])),
            unit,
            topic: topic.into(),
            description: None,
            suggested_simulation: None,
        }
    }

    fn parsed() -> ParsedSyllabus {
        ParsedSyllabus {
            branch: "ECE".into(),
            experiments: vec![
                exp(Some("Digital"), Some(2), "Flip-flops"),
                exp(Some("Analog"), Some(1), "RC filter"),
                exp(Some("Digital"), Some(1), "Logic gates"),
                exp(None, None, "Lab safety"),
                exp(Some("Digital"), Some(2), "Counters"),
            ],
        }
    }

    async fn uploaded() -> (Arc<FakeBackend>, SyllabusController) {
        let backend = Arc::new(FakeBackend::new());
        *backend.parsed.lock().unwrap() = parsed();
        let controller =
            SyllabusController::new(backend.clone(), backend.clone(), clock(), Some("t".into()));
        controller
            .upload(FileUpload::pdf("s5.pdf", &b"%PDF-1.4"[..]))
            .await
            .unwrap();
        (backend, controller)
    }

    #[tokio::test]
    async fn empty_file_is_not_uploaded() {
        let backend = Arc::new(FakeBackend::new());
        let controller = SyllabusController::new(backend.clone(), backend.clone(), clock(), None);
        assert!(controller.upload(FileUpload::pdf("empty.pdf", Vec::new())).await.is_err());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn subjects_and_units_are_listed_once() {
        let (_, controller) = uploaded().await;
        assert_eq!(
            controller.unique_subjects(),
            vec![
                ("Digital".to_string(), Some("Di-1".to_string())),
                ("Analog".to_string(), Some("An-1".to_string())),
            ]
        );
        assert_eq!(controller.unique_units(), vec![1, 2]);
    }

    #[tokio::test]
    async fn grouping_keeps_first_seen_order() {
        let (_, controller) = uploaded().await;
        let groups = controller.grouped();

        let subjects: Vec<&str> = groups.iter().map(|g| g.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Digital", "Analog", "Unknown"]);

        let digital_units: Vec<&str> = groups[0].units.iter().map(|u| u.label.as_str()).collect();
        assert_eq!(digital_units, vec!["Unit 2", "Unit 1"]);
        assert_eq!(groups[0].units[0].experiments.len(), 2);
        assert_eq!(groups[2].units[0].label, "Other");
    }

    #[tokio::test]
    async fn filters_narrow_the_view() {
        let (_, controller) = uploaded().await;
        controller.set_subject_filter(Some("Digital".into()));
        controller.set_unit_filter(Some(2));

        let topics: Vec<String> = controller.filtered().into_iter().map(|e| e.topic).collect();
        assert_eq!(topics, vec!["Flip-flops", "Counters"]);
    }

    #[tokio::test]
    async fn manual_topics_skip_blanks() {
        let backend = Arc::new(FakeBackend::new());
        let controller = SyllabusController::new(backend.clone(), backend.clone(), clock(), None);

        let err = controller
            .submit_manual("Embedded", &["  ".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter at least one topic.");
        assert!(backend.calls().is_empty());

        controller
            .submit_manual("Embedded", &["GPIO".to_string(), "".to_string(), "UART".to_string()])
            .await
            .unwrap();
        let syllabus = controller.snapshot().syllabus.unwrap();
        assert_eq!(syllabus.experiments.len(), 2);
        assert!(syllabus
            .experiments
            .iter()
            .all(|e| e.subject.as_deref() == Some("Embedded")));
    }

    #[tokio::test]
    async fn save_requires_all_three_selections() {
        let (backend, controller) = uploaded().await;
        let err = controller
            .save_to_catalog(Some(1), None, Some(5))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please select college, department, and semester");
        assert!(backend.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_groups_every_experiment_by_subject() {
        let (backend, controller) = uploaded().await;
        controller.set_unit_filter(Some(1));

        controller
            .save_to_catalog(Some(1), Some(10), Some(5))
            .await
            .unwrap();

        let saved = backend.saved.lock().unwrap();
        let request = &saved[0];
        assert_eq!(request.semester, 5);
        let names: Vec<&str> = request.subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["Digital", "Analog", "Unknown"]);
        assert_eq!(request.subjects[0].experiments.len(), 3);
        assert_eq!(request.subjects[2].subject_code, "");
    }
}
