//! Pages, their paths, and the role-aware navigation bar.

use crate::domain::Role;
use crate::guard::RouteGuard;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Home,
    Login,
    Inventory,
    Schedule,
    Syllabus,
    VirtualLabs,
    Resources,
    Assistant,
    Admin,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Login => "/login",
            Page::Inventory => "/inventory",
            Page::Schedule => "/schedule",
            Page::Syllabus => "/syllabus",
            Page::VirtualLabs => "/labs",
            Page::Resources => "/resources",
            Page::Assistant => "/assist",
            Page::Admin => "/admin",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Login => "Login",
            Page::Inventory => "Inventory",
            Page::Schedule => "Schedule",
            Page::Syllabus => "Syllabus AI",
            Page::VirtualLabs => "Virtual Labs",
            Page::Resources => "Resources",
            Page::Assistant => "Assistant",
            Page::Admin => "Admin",
        }
    }

    pub fn from_path(path: &str) -> Option<Page> {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        [
            Page::Home,
            Page::Login,
            Page::Inventory,
            Page::Schedule,
            Page::Syllabus,
            Page::VirtualLabs,
            Page::Resources,
            Page::Assistant,
            Page::Admin,
        ]
        .into_iter()
        .find(|page| page.path() == path)
    }

    /// The guard in front of the page, if any. Only the back office is gated.
    pub fn guard(self) -> Option<RouteGuard> {
        match self {
            Page::Admin => Some(RouteGuard::new(Role::Hod)),
            _ => None,
        }
    }
}

const MAIN_LINKS: [Page; 5] = [
    Page::Inventory,
    Page::Schedule,
    Page::Syllabus,
    Page::VirtualLabs,
    Page::Assistant,
];

/// Links shown in the navigation bar for this viewer.
pub fn nav_links(session: &SessionSnapshot) -> Vec<Page> {
    let mut links = MAIN_LINKS.to_vec();
    if session.can_access_admin() {
        links.push(Page::Admin);
    }
    links
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionControl {
    SignIn,
    SignedIn { email: String, role: Role },
}

pub fn session_control(session: &SessionSnapshot) -> SessionControl {
    match &session.user {
        Some(user) => SessionControl::SignedIn {
            email: user.email.clone(),
            role: user.role,
        },
        None => SessionControl::SignIn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;

    fn signed_in(role: Role) -> SessionSnapshot {
        SessionSnapshot {
            user: Some(User {
                id: 4,
                email: "hod@college.edu".into(),
                role,
                name: None,
            }),
            token: Some("tok".into()),
            loading: false,
        }
    }

    #[test]
    fn admin_link_needs_hod() {
        assert!(!nav_links(&signed_in(Role::Assistant)).contains(&Page::Admin));
        assert!(nav_links(&signed_in(Role::Hod)).contains(&Page::Admin));
    }

    #[test]
    fn paths_resolve_back_to_pages() {
        assert_eq!(Page::from_path("/admin/"), Some(Page::Admin));
        assert_eq!(Page::from_path(""), Some(Page::Home));
        assert_eq!(Page::from_path("/nowhere"), None);
        assert_eq!(Page::Admin.guard(), Some(RouteGuard::new(Role::Hod)));
        assert_eq!(Page::Inventory.guard(), None);
    }

    #[test]
    fn session_control_reflects_user() {
        let anonymous = SessionSnapshot {
            user: None,
            token: None,
            loading: false,
        };
        assert_eq!(session_control(&anonymous), SessionControl::SignIn);
        assert_eq!(
            session_control(&signed_in(Role::Principal)),
            SessionControl::SignedIn {
                email: "hod@college.edu".into(),
                role: Role::Principal
            }
        );
    }
}
