use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Staff,
    Parent,
    Student,
}

/// What the signed-in user may do. Built once per session and handed to
/// every handler instead of being re-read per screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub user_name: String,
    pub role: Role,
    pub permissions: BTreeSet<String>,
}

impl Capabilities {
    pub fn new<I, S>(user_name: impl Into<String>, role: Role, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_name: user_name.into(),
            role,
            permissions: permissions
                .into_iter()
                .map(Into::into)
                .map(|p: String| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn has(&self, permission: &str) -> bool {
        self.role == Role::Admin || self.permissions.contains(permission)
    }
}

#[derive(Debug, Clone, Copy)]
struct NavEntry {
    key: &'static str,
    label: &'static str,
    route: &'static str,
    permission: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct NavSection {
    key: &'static str,
    label: &'static str,
    items: &'static [NavEntry],
}

const fn entry(
    key: &'static str,
    label: &'static str,
    route: &'static str,
    permission: Option<&'static str>,
) -> NavEntry {
    NavEntry {
        key,
        label,
        route,
        permission,
    }
}

const SIDEBAR: &[NavSection] = &[
    NavSection {
        key: "overview",
        label: "Overview",
        items: &[
            entry("dashboard", "Dashboard", "/dashboard", None),
            entry(
                "announcements",
                "Announcements",
                "/announcements",
                Some("announcement.view"),
            ),
        ],
    },
    NavSection {
        key: "people",
        label: "People",
        items: &[
            entry("students", "Students", "/students", Some("student.view")),
            entry("teachers", "Teachers", "/teachers", Some("teacher.view")),
            entry("staff", "Staff", "/staff", Some("staff.view")),
            entry("parents", "Parents", "/parents", Some("parent.view")),
            entry("idCards", "ID Cards", "/id-cards", Some("idcard.generate")),
        ],
    },
    NavSection {
        key: "academics",
        label: "Academics",
        items: &[
            entry("timetable", "Timetable", "/timetable", Some("timetable.view")),
            entry("exams", "Exams", "/exams", Some("exam.view")),
            entry("results", "Results", "/results", Some("result.view")),
            entry(
                "gradeCriteria",
                "Grade Criteria",
                "/grade-criteria",
                Some("gradeCriteria.view"),
            ),
        ],
    },
    NavSection {
        key: "finance",
        label: "Finance",
        items: &[
            entry(
                "feeStructures",
                "Fee Structures",
                "/fees/structures",
                Some("feeStructure.view"),
            ),
            entry(
                "feePayments",
                "Fee Payments",
                "/fees/payments",
                Some("feePayment.view"),
            ),
        ],
    },
    NavSection {
        key: "settings",
        label: "Settings",
        items: &[entry("settings", "Settings", "/settings", Some("settings.manage"))],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub key: String,
    pub label: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarSection {
    pub key: String,
    pub label: String,
    pub items: Vec<NavItem>,
}

fn allowed(caps: &Capabilities, e: &NavEntry) -> bool {
    e.permission.map_or(true, |p| caps.has(p))
}

/// Sidebar for `caps`; sections left without items are dropped.
pub fn sidebar(caps: &Capabilities) -> Vec<SidebarSection> {
    SIDEBAR
        .iter()
        .filter_map(|section| {
            let items: Vec<NavItem> = section
                .items
                .iter()
                .filter(|e| allowed(caps, e))
                .map(|e| NavItem {
                    key: e.key.to_string(),
                    label: e.label.to_string(),
                    route: e.route.to_string(),
                })
                .collect();
            (!items.is_empty()).then(|| SidebarSection {
                key: section.key.to_string(),
                label: section.label.to_string(),
                items,
            })
        })
        .collect()
}

/// Routes outside the catalogue are never accessible.
pub fn can_access(caps: &Capabilities, route: &str) -> bool {
    let route = route.trim_end_matches('/');
    SIDEBAR
        .iter()
        .flat_map(|s| s.items.iter())
        .find(|e| e.route == route)
        .is_some_and(|e| allowed(caps, e))
}
