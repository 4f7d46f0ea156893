//! Target gating
//!
//! Builds [`TargetGate`] predicates that tell the replay engine whether the
//! application a macro was recorded against is currently in front.

mod frontmost;

use std::sync::Arc;

use tracing::trace;

pub use frontmost::{frontmost_app, AppInfo};

use crate::replay::TargetGate;

/// Whether `app` is the target named `target`.
///
/// Matches the application name exactly or the window title by substring,
/// both case-insensitively.
pub fn matches_target(app: &AppInfo, target: &str) -> bool {
    let target = target.trim().to_lowercase();
    if target.is_empty() {
        return true;
    }

    app.name.to_lowercase() == target
        || app
            .window_title
            .as_deref()
            .is_some_and(|title| title.to_lowercase().contains(&target))
}

/// Gate open while the frontmost application matches `target`.
///
/// When the frontmost application cannot be determined the gate stays open,
/// so replay on an unsupported desktop behaves as if ungated.
pub fn frontmost_gate(target: impl Into<String>) -> TargetGate {
    let target = target.into();
    Arc::new(move || match frontmost_app() {
        Some(app) => {
            let active = matches_target(&app, &target);
            trace!("Frontmost app {:?}, target active: {}", app.name, active);
            active
        }
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, title: Option<&str>) -> AppInfo {
        AppInfo {
            name: name.to_string(),
            pid: 42,
            window_title: title.map(str::to_string),
        }
    }

    #[test]
    fn test_matches_app_name_case_insensitively() {
        assert!(matches_target(&app("Notepad", None), "notepad"));
        assert!(!matches_target(&app("Notepad++", None), "notepad"));
    }

    #[test]
    fn test_matches_window_title_substring() {
        let browser = app("firefox", Some("Inbox - Mail - Mozilla Firefox"));
        assert!(matches_target(&browser, "mail"));
        assert!(!matches_target(&browser, "calendar"));
    }

    #[test]
    fn test_blank_target_matches_anything() {
        assert!(matches_target(&app("anything", None), "  "));
    }
}
