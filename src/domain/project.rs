// ==========================================
// 设备数据集导入系统 - 项目模型
// ==========================================
// 职责: 项目持有 new/old 两份数据集，各自附带来源信息与导入日志
// 红线: 切换项目模式属于破坏性操作，必须由调用方显式确认
// ==========================================

use crate::domain::dataset::Dataset;
use crate::domain::import_record::ImportRecord;
use crate::domain::provenance::ProvenanceInfo;
use crate::domain::registry::DataTypeRegistry;
use crate::domain::types::{DatasetSide, ProjectMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 项目元信息（模式切换/数据清空时不受影响）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default)]
    pub engineer: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProjectMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engineer: None,
            client: None,
            description: None,
            created_at: Utc::now(),
        }
    }
}

// ==========================================
// DatasetSlot - 单侧数据集及其附属信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSlot {
    pub dataset: Dataset,
    #[serde(default)]
    pub provenance: ProvenanceInfo,
    #[serde(default)]
    pub import_log: Vec<ImportRecord>,
    /// 导入日志中已被清空操作作废的记录数（日志前缀）
    #[serde(default)]
    pub purged_records: usize,
}

impl DatasetSlot {
    pub fn new(registry: &DataTypeRegistry) -> Self {
        Self {
            dataset: Dataset::with_registry(registry),
            provenance: ProvenanceInfo::default(),
            import_log: Vec::new(),
            purged_records: 0,
        }
    }

    /// 最近一次清空之后的导入记录（来源信息只能由这些记录重建）
    pub fn live_records(&self) -> &[ImportRecord] {
        let start = self.purged_records.min(self.import_log.len());
        &self.import_log[start..]
    }

    /// 清空条目与来源信息，并作废此前的导入记录（日志本身保留），返回清除数量
    pub fn purge(&mut self) -> usize {
        let removed = self.dataset.clear_entries();
        self.provenance.clear();
        self.purged_records = self.import_log.len();
        removed
    }
}

/// 模式切换被拒绝
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("切换项目模式 {from} → {to} 将清空全部数据集，需要显式确认")]
pub struct ConfirmationRequired {
    pub from: ProjectMode,
    pub to: ProjectMode,
}

// ==========================================
// Project - 项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub metadata: ProjectMetadata,
    #[serde(default)]
    mode: ProjectMode,
    new: DatasetSlot,
    old: DatasetSlot,
}

impl Project {
    pub fn new(name: impl Into<String>, registry: &DataTypeRegistry) -> Self {
        Self {
            metadata: ProjectMetadata::new(name),
            mode: ProjectMode::default(),
            new: DatasetSlot::new(registry),
            old: DatasetSlot::new(registry),
        }
    }

    pub fn mode(&self) -> ProjectMode {
        self.mode
    }

    pub fn slot(&self, side: DatasetSide) -> &DatasetSlot {
        match side {
            DatasetSide::New => &self.new,
            DatasetSide::Old => &self.old,
        }
    }

    pub fn slot_mut(&mut self, side: DatasetSide) -> &mut DatasetSlot {
        match side {
            DatasetSide::New => &mut self.new,
            DatasetSide::Old => &mut self.old,
        }
    }

    pub fn dataset(&self, side: DatasetSide) -> &Dataset {
        &self.slot(side).dataset
    }

    pub fn dataset_mut(&mut self, side: DatasetSide) -> &mut Dataset {
        &mut self.slot_mut(side).dataset
    }

    /// 切换项目模式
    ///
    /// # 返回
    /// - Ok(true): 模式已切换，两侧数据集条目与来源信息已清空（元信息、导入日志保留）
    /// - Ok(false): 目标模式与当前相同，未做任何修改
    /// - Err: 未确认
    pub fn set_mode(
        &mut self,
        mode: ProjectMode,
        confirmed: bool,
    ) -> Result<bool, ConfirmationRequired> {
        if mode == self.mode {
            return Ok(false);
        }
        if !confirmed {
            warn!(from = %self.mode, to = %mode, "模式切换未确认，已拒绝");
            return Err(ConfirmationRequired {
                from: self.mode,
                to: mode,
            });
        }

        let purged = self.new.purge() + self.old.purge();
        info!(from = %self.mode, to = %mode, purged, "项目模式已切换，数据集已清空");
        self.mode = mode;
        Ok(true)
    }

    /// 清空单侧数据集条目与来源信息（保留元信息与导入日志），返回清除数量
    pub fn clear_dataset(&mut self, side: DatasetSide) -> usize {
        let removed = self.slot_mut(side).purge();
        info!(side = %side, removed, "数据集已清空");
        removed
    }

    /// 单侧数据集场景改名
    pub fn rename_scenario(&mut self, side: DatasetSide, old: &str, new: &str) -> usize {
        let renamed = self.dataset_mut(side).rename_scenario(old, new);
        info!(side = %side, old, new, renamed, "场景已改名");
        renamed
    }

    /// 单侧数据集删除场景
    pub fn remove_scenario(&mut self, side: DatasetSide, label: &str) -> usize {
        let removed = self.dataset_mut(side).remove_scenario(label);
        info!(side = %side, label, removed, "场景已删除");
        removed
    }
}
