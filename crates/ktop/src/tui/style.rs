//! Colour scheme and styles.

use ktop_lib::query::is_system_namespace;
use ktop_lib::{NodeStatus, PodStatus};
use ratatui::style::{Color, Modifier, Style};

/// Usage at or above this percentage is shown as a warning.
pub const WARNING_PERCENT: f64 = 50.0;
/// Usage at or above this percentage is shown as critical.
pub const CRITICAL_PERCENT: f64 = 80.0;

pub struct Theme;

impl Theme {
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;
    pub const HEADER_FG: Color = Color::Yellow;
    pub const SELECTED_BG: Color = Color::Blue;
    pub const BORDER_FOCUSED: Color = Color::Cyan;

    pub const HEALTHY: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const CRITICAL: Color = Color::Red;

    pub const SYSTEM_NAMESPACE: Color = Color::Cyan;
    pub const SUCCEEDED: Color = Color::Blue;
}

/// Pre-defined styles.
pub struct Styles;

impl Styles {
    pub fn default() -> Style {
        Style::default().fg(Theme::FG)
    }

    pub fn dim() -> Style {
        Style::default().fg(Theme::FG_DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Theme::HEADER_FG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn table_header() -> Style {
        Style::default()
            .fg(Theme::HEADER_FG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .bg(Theme::SELECTED_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(focused: bool) -> Style {
        if focused {
            Style::default().fg(Theme::BORDER_FOCUSED)
        } else {
            Style::default().fg(Theme::FG)
        }
    }

    pub fn key_hint() -> Style {
        Style::default().fg(Theme::HEADER_FG)
    }

    pub fn error() -> Style {
        Style::default().fg(Theme::CRITICAL)
    }
}

/// Green below 50%, yellow from 50%, red from 80%.
pub fn usage_color(percent: f64) -> Color {
    if percent >= CRITICAL_PERCENT {
        Theme::CRITICAL
    } else if percent >= WARNING_PERCENT {
        Theme::WARNING
    } else {
        Theme::HEALTHY
    }
}

pub fn node_status_color(status: NodeStatus) -> Color {
    match status {
        NodeStatus::Ready => Theme::HEALTHY,
        NodeStatus::NotReady | NodeStatus::Unknown => Theme::CRITICAL,
    }
}

pub fn pod_status_color(status: PodStatus) -> Color {
    match status {
        PodStatus::Running => Theme::HEALTHY,
        PodStatus::Pending => Theme::WARNING,
        PodStatus::Succeeded => Theme::SUCCEEDED,
        PodStatus::Failed => Theme::CRITICAL,
        PodStatus::Unknown => Theme::FG_DIM,
    }
}

pub fn namespace_color(namespace: &str) -> Color {
    if is_system_namespace(namespace) {
        Theme::SYSTEM_NAMESPACE
    } else {
        Theme::FG
    }
}

/// White without restarts, yellow with some, red above five.
pub fn restart_color(restarts: i64) -> Color {
    match restarts {
        r if r > 5 => Theme::CRITICAL,
        r if r > 0 => Theme::WARNING,
        _ => Theme::FG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_color_thresholds() {
        assert_eq!(usage_color(0.0), Color::Green);
        assert_eq!(usage_color(49.9), Color::Green);
        assert_eq!(usage_color(50.0), Color::Yellow);
        assert_eq!(usage_color(79.9), Color::Yellow);
        assert_eq!(usage_color(80.0), Color::Red);
        assert_eq!(usage_color(150.0), Color::Red);
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(node_status_color(NodeStatus::Ready), Color::Green);
        assert_eq!(node_status_color(NodeStatus::Unknown), Color::Red);
        assert_eq!(pod_status_color(PodStatus::Pending), Color::Yellow);
        assert_eq!(pod_status_color(PodStatus::Unknown), Color::DarkGray);
    }

    #[test]
    fn test_restart_color() {
        assert_eq!(restart_color(0), Color::White);
        assert_eq!(restart_color(3), Color::Yellow);
        assert_eq!(restart_color(6), Color::Red);
    }

    #[test]
    fn test_namespace_color() {
        assert_eq!(namespace_color("kube-system"), Color::Cyan);
        assert_eq!(namespace_color("shop"), Color::White);
    }
}
