// ==========================================
// 设备数据集导入系统 - 导入记录
// ==========================================
// 用途: 扁平的历史导入日志（审计展示用，非权威数据）
// 来源追踪丢失时可据此重建
// ==========================================

use crate::domain::types::ProjectMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个场景的落地映射（原始标签 → 目标标签）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMapping {
    pub data_type: String,
    pub original_scenario: String,
    pub target_scenario: String,
}

// ==========================================
// ImportRecord - 单文件导入记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub record_id: String,
    pub file_path: String,
    #[serde(default)]
    pub mapping_name: Option<String>,
    pub mode: ProjectMode,
    pub imported_at: DateTime<Utc>,

    /// 本文件实际写入的各类型条目数
    #[serde(default)]
    pub type_counts: BTreeMap<String, usize>,

    /// 本文件贡献了数据的简单型类型
    #[serde(default)]
    pub simple_types: Vec<String>,

    /// 场景型类型的落地映射
    #[serde(default)]
    pub scenario_mappings: Vec<ScenarioMapping>,

    /// 合并前被整体清空的类型（仅 Standard 模式）
    #[serde(default)]
    pub cleared_types: Vec<String>,
}

impl ImportRecord {
    pub fn new(file_path: impl Into<String>, mode: ProjectMode) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.into(),
            mapping_name: None,
            mode,
            imported_at: Utc::now(),
            type_counts: BTreeMap::new(),
            simple_types: Vec::new(),
            scenario_mappings: Vec::new(),
            cleared_types: Vec::new(),
        }
    }

    pub fn total_entries(&self) -> usize {
        self.type_counts.values().sum()
    }
}
