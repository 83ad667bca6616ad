//! crates/labsync_core/src/controllers/catalog.rs
//!
//! Read-only browser over the Virtual Labs catalog. The filters cascade:
//! changing a parent clears every filter and list below it.

use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use super::lock;
use crate::domain::{College, Department, Experiment, Subject};
use crate::inflight::RequestGeneration;
use crate::ports::{ApiResult, CatalogApi};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSelection {
    pub college_id: Option<i64>,
    pub department_id: Option<i64>,
    pub semester: Option<u8>,
    pub subject_id: Option<i64>,

    pub colleges: Vec<College>,
    pub departments: Vec<Department>,
    pub subjects: Vec<Subject>,
    pub experiments: Vec<Experiment>,
    pub loading: bool,
}

impl CatalogSelection {
    pub fn current_subject(&self) -> Option<&Subject> {
        let id = self.subject_id?;
        self.subjects.iter().find(|s| s.id == id)
    }
}

pub struct CatalogBrowser {
    api: Arc<dyn CatalogApi>,
    // One generation per level so a slow parent fetch cannot land after its children changed.
    departments_gen: RequestGeneration,
    subjects_gen: RequestGeneration,
    experiments_gen: RequestGeneration,
    state: Mutex<CatalogSelection>,
}

impl CatalogBrowser {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            departments_gen: RequestGeneration::new(),
            subjects_gen: RequestGeneration::new(),
            experiments_gen: RequestGeneration::new(),
            state: Mutex::new(CatalogSelection::default()),
        }
    }

    pub fn snapshot(&self) -> CatalogSelection {
        lock(&self.state).clone()
    }

    pub async fn load_colleges(&self) -> ApiResult<()> {
        let colleges = self.api.list_colleges().await.inspect_err(|e| {
            error!("Failed to load colleges: {}", e);
        })?;
        lock(&self.state).colleges = colleges;
        Ok(())
    }

    pub async fn select_college(&self, college_id: Option<i64>) -> ApiResult<()> {
        let ticket = self.departments_gen.begin();
        // Invalidate anything in flight further down the cascade.
        self.subjects_gen.begin();
        self.experiments_gen.begin();
        {
            let mut state = lock(&self.state);
            state.college_id = college_id;
            state.department_id = None;
            state.semester = None;
            state.subject_id = None;
            state.departments.clear();
            state.subjects.clear();
            state.experiments.clear();
        }
        let Some(college_id) = college_id else {
            return Ok(());
        };

        let departments = self
            .api
            .list_departments(Some(college_id))
            .await
            .inspect_err(|e| error!("Failed to load departments: {}", e))?;
        if self.departments_gen.is_current(ticket) {
            lock(&self.state).departments = departments;
        } else {
            debug!("Dropping superseded department list");
        }
        Ok(())
    }

    pub async fn select_department(&self, department_id: Option<i64>) -> ApiResult<()> {
        lock(&self.state).department_id = department_id;
        self.refresh_subjects().await
    }

    pub async fn select_semester(&self, semester: Option<u8>) -> ApiResult<()> {
        lock(&self.state).semester = semester;
        self.refresh_subjects().await
    }

    /// Subjects are listed only once both department and semester are chosen.
    async fn refresh_subjects(&self) -> ApiResult<()> {
        let ticket = self.subjects_gen.begin();
        self.experiments_gen.begin();
        let filter = {
            let mut state = lock(&self.state);
            state.subject_id = None;
            state.subjects.clear();
            state.experiments.clear();
            state.department_id.zip(state.semester)
        };
        let Some((department_id, semester)) = filter else {
            return Ok(());
        };

        let subjects = self
            .api
            .list_subjects(Some(department_id), Some(semester))
            .await
            .inspect_err(|e| error!("Failed to load subjects: {}", e))?;
        if self.subjects_gen.is_current(ticket) {
            lock(&self.state).subjects = subjects;
        }
        Ok(())
    }

    pub async fn select_subject(&self, subject_id: Option<i64>) -> ApiResult<()> {
        let ticket = self.experiments_gen.begin();
        {
            let mut state = lock(&self.state);
            state.subject_id = subject_id;
            state.experiments.clear();
            state.loading = subject_id.is_some();
        }
        let Some(subject_id) = subject_id else {
            return Ok(());
        };

        let result = self.api.list_experiments(Some(subject_id), None, None).await;
        let mut state = lock(&self.state);
        if !self.experiments_gen.is_current(ticket) {
            return Ok(());
        }
        state.loading = false;
        match result {
            Ok(experiments) => {
                state.experiments = experiments;
                Ok(())
            }
            Err(e) => {
                error!("Failed to load experiments: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::FakeBackend;

    fn seeded() -> Arc<FakeBackend> {
        let backend = FakeBackend::new();
        *backend.colleges.lock().unwrap() = vec![College { id: 1, name: "GEC".into() }];
        *backend.departments.lock().unwrap() = vec![
            Department { id: 10, name: "ECE".into(), college_id: 1 },
            Department { id: 11, name: "CSE".into(), college_id: 2 },
        ];
        *backend.subjects.lock().unwrap() = vec![Subject {
            id: 20,
            name: "Digital Electronics".into(),
            code: Some("EC302".into()),
            semester: 3,
            department_id: 10,
            default_compiler: None,
            lab_manual_url: None,
        }];
        *backend.experiments.lock().unwrap() = vec![Experiment {
            id: 30,
            subject_id: 20,
            unit: Some(1),
            topic: "Half adder".into(),
            description: None,
            suggested_simulation: None,
            simulation_links: vec![],
        }];
        Arc::new(backend)
    }

    #[tokio::test]
    async fn cascade_loads_each_level() {
        let backend = seeded();
        let browser = CatalogBrowser::new(backend.clone());

        browser.load_colleges().await.unwrap();
        browser.select_college(Some(1)).await.unwrap();
        assert_eq!(browser.snapshot().departments.len(), 1);

        browser.select_department(Some(10)).await.unwrap();
        assert!(browser.snapshot().subjects.is_empty());
        browser.select_semester(Some(3)).await.unwrap();
        assert_eq!(browser.snapshot().subjects.len(), 1);

        browser.select_subject(Some(20)).await.unwrap();
        let state = browser.snapshot();
        assert_eq!(state.experiments[0].topic, "Half adder");
        assert_eq!(state.current_subject().unwrap().name, "Digital Electronics");
        assert!(!state.loading);

        assert_eq!(
            backend.calls(),
            vec![
                "list_colleges",
                "list_departments Some(1)",
                "list_subjects Some(10) Some(3)",
                "list_experiments Some(20)",
            ]
        );
    }

    #[tokio::test]
    async fn changing_college_clears_everything_below() {
        let backend = seeded();
        let browser = CatalogBrowser::new(backend);
        browser.select_college(Some(1)).await.unwrap();
        browser.select_department(Some(10)).await.unwrap();
        browser.select_semester(Some(3)).await.unwrap();
        browser.select_subject(Some(20)).await.unwrap();

        browser.select_college(None).await.unwrap();

        let state = browser.snapshot();
        assert_eq!(state.department_id, None);
        assert_eq!(state.semester, None);
        assert_eq!(state.subject_id, None);
        assert!(state.departments.is_empty());
        assert!(state.subjects.is_empty());
        assert!(state.experiments.is_empty());
    }

    #[tokio::test]
    async fn changing_semester_clears_the_subject() {
        let backend = seeded();
        let browser = CatalogBrowser::new(backend);
        browser.select_department(Some(10)).await.unwrap();
        browser.select_semester(Some(3)).await.unwrap();
        browser.select_subject(Some(20)).await.unwrap();

        browser.select_semester(Some(4)).await.unwrap();

        let state = browser.snapshot();
        assert_eq!(state.subject_id, None);
        assert!(state.subjects.is_empty());
        assert!(state.experiments.is_empty());
    }
}
