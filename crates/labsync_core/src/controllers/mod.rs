//! Page controllers.
//!
//! Each controller owns the local state of one page (filters, form drafts,
//! confirmation prompts, the transient notice) and turns user intent into API
//! calls. State sits behind a `Mutex` that is never held across an `.await`,
//! so a controller can be shared by concurrent requests; list-replacing
//! requests are sequenced with [`crate::inflight::RequestGeneration`].

pub mod admin;
pub mod assistant;
pub mod catalog;
pub mod inventory;
pub mod labs;
pub mod resources;
pub mod schedule;
pub mod syllabus;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use admin::{AdminController, AdminState, CatalogStats};
pub use assistant::{AssistantController, ChatMessage, Speaker};
pub use catalog::{CatalogBrowser, CatalogSelection};
pub use inventory::{InventoryController, InventoryState};
pub use labs::{ExperimentForm, ExperimentTarget, LabsController, LabsState, SubjectForm};
pub use resources::ResourceHubController;
pub use schedule::{ScheduleController, ScheduleState};
pub use syllabus::{SubjectGroup, SyllabusController, SyllabusState, UnitGroup};

/// A panic in another holder leaves plain data behind, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
