// ==========================================
// 设备数据集导入系统 - 复合键模型
// ==========================================
// 职责: 场景型集合的键 (标识[, 次级标识], 场景)
// 场景标签的比较一律大小写不敏感
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 场景型条目的完整身份
///
/// 唯一性基于全部三个分量；仅场景不同的两个条目可以共存。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_id: Option<String>,
    pub scenario: String,
}

impl CompositeKey {
    pub fn new(id: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secondary_id: None,
            scenario: scenario.into(),
        }
    }

    pub fn with_secondary(
        id: impl Into<String>,
        secondary_id: impl Into<String>,
        scenario: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secondary_id: Some(secondary_id.into()),
            scenario: scenario.into(),
        }
    }

    /// 仅替换场景分量，标识与次级标识保持不变
    pub fn with_scenario(&self, scenario: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            secondary_id: self.secondary_id.clone(),
            scenario: scenario.into(),
        }
    }

    pub fn scenario_matches(&self, label: &str) -> bool {
        scenario_eq(&self.scenario, label)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary_id {
            Some(secondary) => write!(f, "{}/{}@{}", self.id, secondary, self.scenario),
            None => write!(f, "{}@{}", self.id, self.scenario),
        }
    }
}

/// 场景标签比较（大小写不敏感，忽略首尾空白）
pub fn scenario_eq(a: &str, b: &str) -> bool {
    normalize_scenario(a) == normalize_scenario(b)
}

/// 场景标签归一化（用于去重与查找）
pub fn normalize_scenario(label: &str) -> String {
    label.trim().to_lowercase()
}

/// 大小写不敏感去重，保留首次出现的写法，结果按归一化形式排序
pub fn dedup_scenarios<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: std::collections::BTreeMap<String, String> = std::collections::BTreeMap::new();
    for label in labels {
        let label = label.as_ref();
        seen.entry(normalize_scenario(label))
            .or_insert_with(|| label.trim().to_string());
    }
    seen.into_values().collect()
}
