//! Enumerations and field types for sub-project tracking.
//!
//! This module defines the structured values used to classify sub-projects and
//! their checklist tasks: project types, the ordered design stages, and the
//! task groups that template categories belong to.
//!
//! Every enum serialises as kebab-case English and also accepts the labels
//! written by the original web dashboard, so documents stored by either
//! client load without translation.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kind of building a sub-project covers. Selects the template checklist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    #[serde(alias = "核岛厂房")]
    NuclearIsland,
    #[serde(alias = "附属工业厂房")]
    AuxiliaryIndustrial,
    #[serde(alias = "其他")]
    Other,
}

impl ProjectType {
    pub const ALL: [ProjectType; 3] = [
        ProjectType::NuclearIsland,
        ProjectType::AuxiliaryIndustrial,
        ProjectType::Other,
    ];

    /// Parse a stored label, accepting both the kebab-case and dashboard forms.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "nuclear-island" | "核岛厂房" => Some(ProjectType::NuclearIsland),
            "auxiliary-industrial" | "附属工业厂房" => Some(ProjectType::AuxiliaryIndustrial),
            "other" | "其他" => Some(ProjectType::Other),
            _ => None,
        }
    }
}

impl Default for ProjectType {
    fn default() -> Self {
        ProjectType::Other
    }
}

/// Design stages in the order a sub-project moves through them.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum DesignStage {
    #[serde(alias = "方案设计")]
    Schematic,
    #[serde(alias = "初步设计")]
    Preliminary,
    #[serde(alias = "施工图设计")]
    ConstructionDrawing,
}

impl DesignStage {
    pub const ALL: [DesignStage; 3] = [
        DesignStage::Schematic,
        DesignStage::Preliminary,
        DesignStage::ConstructionDrawing,
    ];

    /// The stage that follows this one, or `None` at construction drawing.
    pub fn next(self) -> Option<DesignStage> {
        match self {
            DesignStage::Schematic => Some(DesignStage::Preliminary),
            DesignStage::Preliminary => Some(DesignStage::ConstructionDrawing),
            DesignStage::ConstructionDrawing => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Short slug used as the prefix of synthesized task ids.
    pub fn slug(self) -> &'static str {
        match self {
            DesignStage::Schematic => "schematic",
            DesignStage::Preliminary => "preliminary",
            DesignStage::ConstructionDrawing => "construction",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "schematic" | "方案设计" => Some(DesignStage::Schematic),
            "preliminary" | "初步设计" => Some(DesignStage::Preliminary),
            "construction-drawing" | "施工图设计" => Some(DesignStage::ConstructionDrawing),
            _ => None,
        }
    }
}

impl Default for DesignStage {
    fn default() -> Self {
        DesignStage::Schematic
    }
}

/// Group a template category (and so each task) belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskGroup {
    #[serde(alias = "INTERFACE")]
    InterfaceCoordination,
    #[serde(alias = "RISK")]
    RiskControl,
    #[serde(alias = "DELIVERABLE")]
    Deliverable,
}

impl TaskGroup {
    pub const ALL: [TaskGroup; 3] = [
        TaskGroup::InterfaceCoordination,
        TaskGroup::RiskControl,
        TaskGroup::Deliverable,
    ];

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "interface-coordination" | "INTERFACE" => Some(TaskGroup::InterfaceCoordination),
            "risk-control" | "RISK" => Some(TaskGroup::RiskControl),
            "deliverable" | "DELIVERABLE" => Some(TaskGroup::Deliverable),
            _ => None,
        }
    }
}

/// File kind of a gallery entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GalleryKind {
    Image,
    Pdf,
}

/// Format a project type for display.
pub fn format_project_type(t: ProjectType) -> &'static str {
    match t {
        ProjectType::NuclearIsland => "Nuclear Island",
        ProjectType::AuxiliaryIndustrial => "Auxiliary Industrial",
        ProjectType::Other => "Other",
    }
}

/// Format a design stage for display.
pub fn format_stage(s: DesignStage) -> &'static str {
    match s {
        DesignStage::Schematic => "Schematic Design",
        DesignStage::Preliminary => "Preliminary Design",
        DesignStage::ConstructionDrawing => "Construction Drawing",
    }
}

/// Format a task group for display.
pub fn format_group(g: TaskGroup) -> &'static str {
    match g {
        TaskGroup::InterfaceCoordination => "Interface Coordination",
        TaskGroup::RiskControl => "Risk Control",
        TaskGroup::Deliverable => "Deliverables",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_next() {
        assert!(DesignStage::Schematic < DesignStage::Preliminary);
        assert!(DesignStage::Preliminary < DesignStage::ConstructionDrawing);
        assert_eq!(DesignStage::Schematic.next(), Some(DesignStage::Preliminary));
        assert_eq!(DesignStage::ConstructionDrawing.next(), None);
        assert!(DesignStage::ConstructionDrawing.is_terminal());
    }

    #[test]
    fn test_dashboard_labels_deserialize() {
        let t: ProjectType = serde_json::from_str("\"附属工业厂房\"").unwrap();
        assert_eq!(t, ProjectType::AuxiliaryIndustrial);
        let s: DesignStage = serde_json::from_str("\"施工图设计\"").unwrap();
        assert_eq!(s, DesignStage::ConstructionDrawing);
        let g: TaskGroup = serde_json::from_str("\"RISK\"").unwrap();
        assert_eq!(g, TaskGroup::RiskControl);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"construction-drawing\"");
    }

    #[test]
    fn test_from_label_rejects_unknown() {
        assert_eq!(ProjectType::from_label("warehouse"), None);
        assert_eq!(DesignStage::from_label(""), None);
        assert_eq!(TaskGroup::from_label("CALCULATION"), None);
        assert_eq!(TaskGroup::from_label(" deliverable "), Some(TaskGroup::Deliverable));
    }
}
