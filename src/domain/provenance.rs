// ==========================================
// 设备数据集导入系统 - 来源信息模型
// ==========================================
// 职责: 记录"哪个文件最后提供了哪个 类型 / (类型, 场景) 切片"
// 红线: 纯派生/辅助结构，缺失时不得妨碍数据集本身的读写
// ==========================================

use crate::domain::import_record::ImportRecord;
use crate::domain::keys::scenario_eq;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 场景型切片的来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeSource {
    pub file_path: String,
    /// 导入时改名前的原始场景标签（未改名为 None）
    #[serde(default)]
    pub original_scenario: Option<String>,
    pub target_scenario: String,
}

impl CompositeSource {
    pub fn new(file_path: &str, original: &str, target: &str) -> Self {
        let original_scenario = if original.trim() == target.trim() {
            None
        } else {
            Some(original.trim().to_string())
        };
        Self {
            file_path: file_path.to_string(),
            original_scenario,
            target_scenario: target.trim().to_string(),
        }
    }
}

// ==========================================
// ProvenanceInfo - 来源信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceInfo {
    /// 简单型: 类型名 → 最后提供数据的文件（整类型粒度，后写者胜）
    #[serde(default)]
    pub data_type_sources: BTreeMap<String, String>,

    /// 场景型: 类型名 → (目标场景 → 来源)
    #[serde(default)]
    pub composite_data_type_sources: BTreeMap<String, BTreeMap<String, CompositeSource>>,
}

impl ProvenanceInfo {
    pub fn is_empty(&self) -> bool {
        self.data_type_sources.is_empty() && self.composite_data_type_sources.is_empty()
    }

    pub fn record_simple(&mut self, data_type: &str, file_path: &str) {
        self.data_type_sources
            .insert(data_type.to_string(), file_path.to_string());
    }

    /// 记录场景型切片来源（同目标场景大小写不敏感视为同一槽位，覆盖而非追加）
    pub fn record_composite(&mut self, data_type: &str, source: CompositeSource) {
        let by_scenario = self
            .composite_data_type_sources
            .entry(data_type.to_string())
            .or_default();
        by_scenario.retain(|label, _| !scenario_eq(label, &source.target_scenario));
        by_scenario.insert(source.target_scenario.clone(), source);
    }

    /// 清除某类型的全部来源记录
    pub fn clear_type(&mut self, data_type: &str) {
        self.data_type_sources.remove(data_type);
        self.composite_data_type_sources.remove(data_type);
    }

    pub fn clear(&mut self) {
        self.data_type_sources.clear();
        self.composite_data_type_sources.clear();
    }

    pub fn source_for_type(&self, data_type: &str) -> Option<&str> {
        self.data_type_sources.get(data_type).map(String::as_str)
    }

    pub fn source_for_scenario(&self, data_type: &str, scenario: &str) -> Option<&CompositeSource> {
        self.composite_data_type_sources
            .get(data_type)?
            .iter()
            .find(|(label, _)| scenario_eq(label, scenario))
            .map(|(_, source)| source)
    }

    /// 按文件 → 类型 → 场景 组织为树形视图
    pub fn to_tree(&self) -> ProvenanceTree {
        let mut tree = ProvenanceTree::default();

        for (data_type, file_path) in &self.data_type_sources {
            tree.files
                .entry(file_path.clone())
                .or_default()
                .data_types
                .entry(data_type.clone())
                .or_default();
        }

        for (data_type, by_scenario) in &self.composite_data_type_sources {
            for source in by_scenario.values() {
                tree.files
                    .entry(source.file_path.clone())
                    .or_default()
                    .data_types
                    .entry(data_type.clone())
                    .or_default()
                    .push(ScenarioAttribution {
                        target_scenario: source.target_scenario.clone(),
                        original_scenario: source.original_scenario.clone(),
                    });
            }
        }

        tree
    }

    /// 应用单条导入记录（先清除被整体替换的类型，再登记本文件的贡献）
    pub fn apply_record(&mut self, record: &ImportRecord) {
        for data_type in &record.cleared_types {
            self.clear_type(data_type);
        }
        for data_type in &record.simple_types {
            self.record_simple(data_type, &record.file_path);
        }
        for mapping in &record.scenario_mappings {
            self.record_composite(
                &mapping.data_type,
                CompositeSource::new(
                    &record.file_path,
                    &mapping.original_scenario,
                    &mapping.target_scenario,
                ),
            );
        }
    }

    /// 依据导入记录日志按时间顺序重建
    pub fn rebuild_from_records(records: &[ImportRecord]) -> Self {
        let mut info = ProvenanceInfo::default();
        for record in records {
            info.apply_record(record);
        }
        info
    }
}

// ==========================================
// 来源树（查询视图）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceTree {
    pub files: BTreeMap<String, FileProvenance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProvenance {
    /// 类型名 → 场景列表（简单型为空列表）
    pub data_types: BTreeMap<String, Vec<ScenarioAttribution>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioAttribution {
    pub target_scenario: String,
    pub original_scenario: Option<String>,
}

impl ProvenanceTree {
    /// 树中叶子节点总数（简单型类型计 1，场景型按场景计）
    pub fn leaf_count(&self) -> usize {
        self.files
            .values()
            .flat_map(|f| f.data_types.values())
            .map(|scenarios| scenarios.len().max(1))
            .sum()
    }
}
