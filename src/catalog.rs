//! Template catalog of checklist categories per project type and design stage.
//!
//! The catalog is compile-time data. Each `(ProjectType, DesignStage)` pair
//! resolves to its own ordered list of categories; lookups never fail because
//! every pair is populated.

use crate::fields::{DesignStage, ProjectType, TaskGroup};

/// One checklist entry in a template category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateItem {
    pub id: &'static str,
    pub content: &'static str,
    pub group: TaskGroup,
    pub category_id: &'static str,
    pub category: &'static str,
    /// Included in the condensed executive view.
    pub minimal: bool,
}

/// A named, grouped set of template items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub group: TaskGroup,
    pub items: &'static [TemplateItem],
}

macro_rules! category {
    ($id:literal, $name:literal, $group:expr, [$(($item:literal, $content:literal, $minimal:literal)),* $(,)?]) => {
        TemplateCategory {
            id: $id,
            name: $name,
            group: $group,
            items: &[$(TemplateItem {
                id: $item,
                content: $content,
                group: $group,
                category_id: $id,
                category: $name,
                minimal: $minimal,
            }),*],
        }
    };
}

use TaskGroup::{Deliverable, InterfaceCoordination, RiskControl};

// Schematic and preliminary design share one checklist for nuclear-island and
// auxiliary buildings; construction drawing has its own.
static NUCLEAR_ISLAND_EARLY: [TemplateCategory; 3] = [
    category!("ni-interface", "多专业接口", InterfaceCoordination, [
        ("ni-i-1", "核岛相关专业条件是否齐备（工艺系统/电气条件/安全级别与边界）", true),
        ("ni-i-2", "核岛系统边界条件是否统一（房间边界/安全边界）", false),
    ]),
    category!("ni-risk", "安全与系统风险", RiskControl, [
        ("ni-r-1", "主要通风与空调系统方案是否明确（系统划分/运行工况/设备配置原则）", true),
        ("ni-r-2", "关键房间安全风险控制方案是否确认", false),
    ]),
    category!("ni-deliver", "阶段成果", Deliverable, [
        ("ni-d-1", "初设阶段暖通成果是否形成（初设说明书/系统图/关键计算文件）", true),
    ]),
];

static NUCLEAR_ISLAND_CONSTRUCTION: [TemplateCategory; 3] = [
    category!("ni-interface", "多专业接口", InterfaceCoordination, [
        ("ni-ci-1", "多专业接口条件是否最终确认（结构预留/电气接口/仪控边界）", true),
        ("ni-ci-2", "施工图接口变更记录是否闭合", false),
    ]),
    category!("ni-risk", "安全与系统风险", RiskControl, [
        ("ni-cr-1", "关键系统与房间通风空调设计是否闭合（系统完整性/冗余/极端工况）", true),
        ("ni-cr-2", "系统冗余与关键设备配置是否落实", false),
    ]),
    category!("ni-deliver", "阶段成果", Deliverable, [
        ("ni-cd-1", "施工图阶段成果文件是否齐全（施工图/设备表/计算书/设计说明）", true),
    ]),
];

static AUXILIARY_EARLY: [TemplateCategory; 3] = [
    category!("aux-interface", "多专业接口", InterfaceCoordination, [
        ("aux-i-1", "其他专业关键条件是否齐备（工艺条件/电气防爆分区/安全条件）", true),
        ("aux-i-2", "厂房边界条件是否明确（净高/设备区划分）", false),
    ]),
    category!("aux-risk", "安全与风险控制", RiskControl, [
        ("aux-r-1", "危险气体相关通风设计是否完成（氯气/氢气区域通风方案与计算）", true),
        ("aux-r-2", "事故通风系统设置条件是否落实", false),
    ]),
    category!("aux-deliver", "阶段成果", Deliverable, [
        ("aux-d-1", "当前阶段成果文件是否已形成（暖通图纸或说明性成果）", true),
    ]),
];

static AUXILIARY_CONSTRUCTION: [TemplateCategory; 3] = [
    category!("aux-interface", "多专业接口", InterfaceCoordination, [
        ("aux-ci-1", "多专业接口条件是否最终确认（结构预留/电气接口/仪控边界）", true),
        ("aux-ci-2", "现场接口变更记录是否闭合", false),
    ]),
    category!("aux-risk", "安全与风险控制", RiskControl, [
        ("aux-cr-1", "危险气体区域通风系统是否闭合（冗余/极端工况）", true),
        ("aux-cr-2", "事故通风系统联锁与排风路径是否确认", false),
    ]),
    category!("aux-deliver", "阶段成果", Deliverable, [
        ("aux-cd-1", "施工图阶段成果文件是否齐全（施工图/设备表/计算书/设计说明）", true),
    ]),
];

static GENERAL_EARLY: [TemplateCategory; 3] = [
    category!("gen-interface", "多专业接口", InterfaceCoordination, [
        ("gen-i-1", "多专业接口条件是否齐备", true),
        ("gen-i-2", "关键边界条件是否明确", false),
    ]),
    category!("gen-risk", "安全与风险控制", RiskControl, [
        ("gen-r-1", "安全/风险相关系统方案是否明确", true),
    ]),
    category!("gen-deliver", "阶段成果", Deliverable, [
        ("gen-d-1", "当前阶段成果文件是否已形成", true),
    ]),
];

static GENERAL_CONSTRUCTION: [TemplateCategory; 3] = [
    category!("gen-interface", "多专业接口", InterfaceCoordination, [
        ("gen-ci-1", "多专业接口条件是否最终确认", true),
    ]),
    category!("gen-risk", "安全与风险控制", RiskControl, [
        ("gen-cr-1", "关键系统设计是否闭合", true),
    ]),
    category!("gen-deliver", "阶段成果", Deliverable, [
        ("gen-cd-1", "施工图阶段成果文件是否齐全", true),
    ]),
];

/// Ordered template categories for a project type at a design stage.
pub fn categories(project_type: ProjectType, stage: DesignStage) -> &'static [TemplateCategory] {
    use DesignStage::*;
    use ProjectType::*;
    match (project_type, stage) {
        (NuclearIsland, Schematic | Preliminary) => &NUCLEAR_ISLAND_EARLY,
        (NuclearIsland, ConstructionDrawing) => &NUCLEAR_ISLAND_CONSTRUCTION,
        (AuxiliaryIndustrial, Schematic | Preliminary) => &AUXILIARY_EARLY,
        (AuxiliaryIndustrial, ConstructionDrawing) => &AUXILIARY_CONSTRUCTION,
        (Other, Schematic | Preliminary) => &GENERAL_EARLY,
        (Other, ConstructionDrawing) => &GENERAL_CONSTRUCTION,
    }
}

/// Category ids for a pair, in catalog order.
pub fn category_ids(project_type: ProjectType, stage: DesignStage) -> Vec<String> {
    categories(project_type, stage)
        .iter()
        .map(|c| c.id.to_string())
        .collect()
}

pub fn find_category(
    project_type: ProjectType,
    stage: DesignStage,
    id: &str,
) -> Option<&'static TemplateCategory> {
    categories(project_type, stage).iter().find(|c| c.id == id)
}

/// Look a category id up across every pair. Used to recover the group of
/// tasks whose stored group is missing or unrecognised.
pub fn find_category_any(id: &str) -> Option<&'static TemplateCategory> {
    ProjectType::ALL
        .iter()
        .flat_map(|&t| DesignStage::ALL.iter().map(move |&s| categories(t, s)))
        .flat_map(|cats| cats.iter())
        .find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pair_has_three_groups_in_order() {
        for t in ProjectType::ALL {
            for s in DesignStage::ALL {
                let groups: Vec<TaskGroup> = categories(t, s).iter().map(|c| c.group).collect();
                assert_eq!(groups, vec![InterfaceCoordination, RiskControl, Deliverable]);
            }
        }
    }

    #[test]
    fn test_items_reference_their_category() {
        for t in ProjectType::ALL {
            for s in DesignStage::ALL {
                for cat in categories(t, s) {
                    assert!(!cat.items.is_empty());
                    for item in cat.items {
                        assert_eq!(item.category_id, cat.id);
                        assert_eq!(item.category, cat.name);
                        assert_eq!(item.group, cat.group);
                    }
                }
            }
        }
    }

    #[test]
    fn test_general_schematic_has_four_items() {
        let count: usize = categories(ProjectType::Other, DesignStage::Schematic)
            .iter()
            .map(|c| c.items.len())
            .sum();
        assert_eq!(count, 4);
        assert_eq!(
            category_ids(ProjectType::Other, DesignStage::Schematic),
            vec!["gen-interface", "gen-risk", "gen-deliver"]
        );
    }

    #[test]
    fn test_find_category_any() {
        assert_eq!(find_category_any("aux-risk").map(|c| c.group), Some(RiskControl));
        assert!(find_category_any("custom").is_none());
        assert!(find_category(ProjectType::Other, DesignStage::Schematic, "ni-risk").is_none());
    }
}
