//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::TaskGroup;

/// Interface coordination
pub const DARK_BLUE: Color = Color::Rgb(30, 64, 140);
/// Risk control
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Deliverables
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Read-only history banner
pub const GOLD: Color = Color::Rgb(255, 215, 0);

pub fn group_color(group: TaskGroup) -> Color {
    match group {
        TaskGroup::InterfaceCoordination => DARK_BLUE,
        TaskGroup::RiskControl => DARK_RED,
        TaskGroup::Deliverable => DARK_GREEN,
    }
}
