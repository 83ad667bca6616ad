pub mod clock;
pub mod controllers;
pub mod domain;
pub mod guard;
pub mod inflight;
pub mod navigation;
pub mod notice;
pub mod ports;
pub mod session;
pub mod token;
pub mod undo;

pub use clock::{ManualClock, SystemClock};
pub use domain::{College, Department, InventoryItem, Role, ScheduleEntry, UnknownRole, User};
pub use guard::{GuardDecision, GuardOutcome, RouteGuard};
pub use navigation::Page;
pub use notice::{Notice, NoticeKind};
pub use ports::{
    ApiError, ApiResult, AssistantApi, AuthApi, CatalogApi, Clock, EngagementApi, InventoryApi,
    ScheduleApi, SyllabusApi, TokenStore,
};
pub use session::{SessionSnapshot, SessionStore};
pub use token::MemoryTokenStore;
pub use undo::{DeletedEntry, DeletedItem, DeletedItemBuffer};
