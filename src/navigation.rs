//! Role-gated page routing for the single-page client.
//!
//! The client asks where a viewer may go; the guard either admits the target
//! page or keeps the viewer where they are with a notification explaining why.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schema::db::Role;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Home,
    Report,
    Track,
    Admin,
    Profile,
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Page::Home),
            "report" => Ok(Page::Report),
            "track" => Ok(Page::Track),
            "admin" => Ok(Page::Admin),
            "profile" => Ok(Page::Profile),
            other => Err(format!("unknown page `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Outcome of a navigation attempt: the page the viewer ends up on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Navigation {
    pub page: Page,
    pub allowed: bool,
    pub notification: Option<Notification>,
}

impl Navigation {
    fn allow(page: Page) -> Self {
        Navigation {
            page,
            allowed: true,
            notification: None,
        }
    }

    fn deny(current: Page, message: &str) -> Self {
        Navigation {
            page: current,
            allowed: false,
            notification: Some(Notification {
                kind: NotificationKind::Error,
                message: message.to_string(),
            }),
        }
    }
}

pub fn navigate(current: Page, target: Page, viewer: Option<Role>) -> Navigation {
    match (target, viewer) {
        (Page::Admin, Some(Role::Admin)) => Navigation::allow(target),
        (Page::Admin, _) => Navigation::deny(current, "Access denied. Admin privileges required."),
        (Page::Report, Some(Role::Admin)) => Navigation::deny(
            current,
            "Administrators cannot report issues. Only citizens can report.",
        ),
        (Page::Report | Page::Track | Page::Profile, None) => {
            Navigation::deny(current, "Please login to access this feature.")
        }
        _ => Navigation::allow(target),
    }
}
