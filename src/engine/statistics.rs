// ==========================================
// 设备数据集导入系统 - 场景发现与统计
// ==========================================
// 职责: 从数据集推导场景集合与 类型×场景 条目数
// 红线: 场景标签大小写不敏感去重
// ==========================================

use crate::domain::dataset::{Dataset, TypeCollection};
use crate::domain::keys::dedup_scenarios;
use std::collections::BTreeMap;

/// 简单型数据类型在统计中使用的哨兵标签（表示"无场景维度"）
pub const NO_SCENARIO: &str = "(no scenario)";

/// 数据集中出现过的全部场景标签
///
/// 所有场景型集合的键的场景分量之并集，大小写不敏感去重，
/// 保留首次出现的写法，按归一化形式排序。
pub fn available_scenarios(dataset: &Dataset) -> Vec<String> {
    dedup_scenarios(
        dataset
            .collections()
            .flat_map(|(_, collection)| collection.scenario_labels()),
    )
}

/// 类型 → (场景 → 条目数)
///
/// 空集合不出现；简单型类型只有一个 NO_SCENARIO 标签。
pub fn statistics_by_scenario(dataset: &Dataset) -> BTreeMap<String, BTreeMap<String, usize>> {
    dataset
        .collections()
        .filter(|(_, collection)| !collection.is_empty())
        .map(|(name, collection)| {
            let counts = match collection {
                TypeCollection::Simple(entries) => {
                    BTreeMap::from([(NO_SCENARIO.to_string(), entries.len())])
                }
                TypeCollection::Scenario { .. } => collection.scenario_counts(),
            };
            (name.to_string(), counts)
        })
        .collect()
}

/// 某类型在各场景下的条目数是否全部相等
///
/// 该类型没有任何场景标签时视为均匀（空真）。
pub fn is_uniform(dataset: &Dataset, data_type: &str) -> bool {
    let Some(collection) = dataset.collection(data_type) else {
        return true;
    };
    let counts = collection.scenario_counts();
    let mut values = counts.values();
    match values.next() {
        None => true,
        Some(first) => values.all(|count| count == first),
    }
}

/// 类型 → 条目数（仅非空类型）
pub fn type_counts(dataset: &Dataset) -> BTreeMap<String, usize> {
    dataset
        .collections()
        .filter(|(_, collection)| !collection.is_empty())
        .map(|(name, collection)| (name.to_string(), collection.len()))
        .collect()
}
