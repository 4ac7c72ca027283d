//! Reference library of mandatory code clauses and common design errors.
//!
//! Browsing shows a random sample; a search term shows every match instead.

use rand::seq::SliceRandom;
use rand::Rng;

/// Entries shown when browsing without a search term.
pub const DEFAULT_DISPLAY_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MandatoryClause {
    pub id: &'static str,
    /// Standard the clause belongs to, e.g. `GB 50016-2014`.
    pub code: &'static str,
    pub clause_number: &'static str,
    pub content: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonError {
    pub id: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub solution: &'static str,
}

pub static MANDATORY_CLAUSES: [MandatoryClause; 7] = [
    MandatoryClause {
        id: "m2",
        code: "GB 50016-2014",
        clause_number: "9.3.11",
        content: "通风、空气调节系统的风管在穿越防火分区处、穿越通风、空气调节机房的房间隔墙和楼板处等部位应设置防火阀。",
    },
    MandatoryClause {
        id: "m4",
        code: "GB 50019-2015",
        clause_number: "6.3.9",
        content: "事故通风的排风口，应配置在有害气体散发量可能最大的地点。",
    },
    MandatoryClause {
        id: "m5",
        code: "GB 50016-2014",
        clause_number: "8.5.3",
        content: "民用建筑的下列场所或部位应设置排烟设施：设置在一、二、三层且房间建筑面积大于100m²的歌舞娱乐放映游艺场所。",
    },
    MandatoryClause {
        id: "m6",
        code: "GB 50016-2014",
        clause_number: "9.3.2",
        content: "厂房内有爆炸危险场所的排风管道，严禁穿过防火墙和有爆炸危险的房间隔墙。",
    },
    MandatoryClause {
        id: "m7",
        code: "GB 50189-2015",
        clause_number: "4.2.19",
        content: "空调冷却水系统应设置自动监测与控制功能，并应能根据负荷变化自动调节冷却水流量或风机转速。",
    },
    MandatoryClause {
        id: "m9",
        code: "GB 50016-2014",
        clause_number: "6.4.1",
        content: "疏散楼梯间应符合下列规定：楼梯间内不应设置烧水间、可燃材料储藏室、垃圾道。",
    },
    MandatoryClause {
        id: "m11",
        code: "GB 50016-2014",
        clause_number: "9.3.16",
        content: "燃油或燃气锅炉房应设置自然通风或机械通风设施。燃气锅炉房应选用防爆型的事故排风机。",
    },
];

pub static COMMON_ERRORS: [CommonError; 4] = [
    CommonError {
        id: "err1",
        title: "防火阀设置遗漏",
        category: "通风系统",
        description: "经常遗漏穿越重要机房或变形缝处的防火阀。",
        solution: "检查所有穿越防火分区、变形缝及重要设备机房的管段，并在系统图中标注。",
    },
    CommonError {
        id: "err2",
        title: "冷凝水管坡度不足",
        category: "通用设计流程",
        description: "吊顶空间有限时，冷凝水管坡度往往小于0.005，导致排水不畅漏水。",
        solution: "在剖面图中严格复核吊顶高度，确保至少1%的坡度，必要时增加提升泵。",
    },
    CommonError {
        id: "err3",
        title: "采暖管道补偿器选型错误",
        category: "采暖管道",
        description: "高层建筑立管未考虑足够的自然补偿或补偿器安装位置错误。",
        solution: "严格计算热伸长量，优先利用L型、Z型自然补偿，固定支架必须能承受推力。",
    },
    CommonError {
        id: "err4",
        title: "结构孔洞提资遗漏",
        category: "结构提资",
        description: "由于管线综合调整后未及时更新结构提资图，导致现场开洞困难。",
        solution: "在最终出图前，必须进行一次结构底图与暖通平面图的叠图检查。",
    },
];

/// Clauses whose content or standard code contains `query`.
pub fn search_clauses(query: &str) -> Vec<&'static MandatoryClause> {
    let q = query.trim();
    MANDATORY_CLAUSES
        .iter()
        .filter(|c| c.content.contains(q) || c.code.contains(q))
        .collect()
}

/// Errors whose title or description contains `query`.
pub fn search_errors(query: &str) -> Vec<&'static CommonError> {
    let q = query.trim();
    COMMON_ERRORS
        .iter()
        .filter(|e| e.title.contains(q) || e.description.contains(q))
        .collect()
}

/// Shuffle a list and keep the first `count` entries.
pub fn sample<'a, T, R: Rng + ?Sized>(items: &'a [T], count: usize, rng: &mut R) -> Vec<&'a T> {
    let mut refs: Vec<&T> = items.iter().collect();
    refs.shuffle(rng);
    refs.truncate(count);
    refs
}

/// What the clause panel shows: every match for a non-blank query, otherwise a random sample.
pub fn browse_clauses(query: Option<&str>, count: usize) -> Vec<&'static MandatoryClause> {
    match query.filter(|q| !q.trim().is_empty()) {
        Some(q) => search_clauses(q),
        None => sample(&MANDATORY_CLAUSES, count, &mut rand::thread_rng()),
    }
}

pub fn browse_errors(query: Option<&str>, count: usize) -> Vec<&'static CommonError> {
    match query.filter(|q| !q.trim().is_empty()) {
        Some(q) => search_errors(q),
        None => sample(&COMMON_ERRORS, count, &mut rand::thread_rng()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_search_by_code_or_content() {
        let by_code = search_clauses("GB 50019");
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].id, "m4");
        let by_content = search_clauses("防火阀");
        assert_eq!(by_content.iter().map(|c| c.id).collect::<Vec<_>>(), vec!["m2"]);
        assert!(search_clauses("no such text").is_empty());
    }

    #[test]
    fn test_search_errors_title_or_description() {
        assert_eq!(search_errors("坡度")[0].id, "err2");
        assert_eq!(search_errors("开洞")[0].id, "err4");
        // Solutions are not searched.
        assert!(search_errors("叠图").is_empty());
    }

    #[test]
    fn test_sample_is_a_permutation_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample(&MANDATORY_CLAUSES, 4, &mut rng);
        assert_eq!(picked.len(), 4);
        let ids: HashSet<&str> = picked.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 4);

        let all = sample(&COMMON_ERRORS, 99, &mut rng);
        assert_eq!(all.len(), COMMON_ERRORS.len());
    }

    #[test]
    fn test_browse_ignores_count_when_searching() {
        assert_eq!(browse_clauses(Some("GB 50016"), 1).len(), 5);
        assert_eq!(browse_clauses(Some("   "), 2).len(), 2);
        assert_eq!(browse_errors(None, DEFAULT_DISPLAY_COUNT).len(), 4);
    }
}
