// ==========================================
// 设备数据集导入系统 - 领域类型定义
// ==========================================
// 职责: 项目模式、数据集侧别、导入动作等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 项目模式 (Project Mode)
// ==========================================
// 决定合并策略: Standard 按类型整体替换; Composite 按场景增量合并
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectMode {
    #[default]
    Standard,
    Composite,
}

impl fmt::Display for ProjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectMode::Standard => write!(f, "STANDARD"),
            ProjectMode::Composite => write!(f, "COMPOSITE"),
        }
    }
}

// ==========================================
// 数据集侧别 (Dataset Side)
// ==========================================
// 项目固定持有两份数据集: new(改造后) / old(改造前)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetSide {
    New,
    Old,
}

impl fmt::Display for DatasetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSide::New => write!(f, "NEW"),
            DatasetSide::Old => write!(f, "OLD"),
        }
    }
}

impl std::str::FromStr for DatasetSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(DatasetSide::New),
            "old" => Ok(DatasetSide::Old),
            other => Err(format!("未知数据集侧别: {}（仅支持 new/old）", other)),
        }
    }
}

// ==========================================
// 导入动作 (Import Action)
// ==========================================
// 每个 (文件, 场景) 行的用户决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportAction {
    AddNew,    // 作为新场景导入（可改名）
    Overwrite, // 覆盖已有场景
    Skip,      // 不导入
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportAction::AddNew => write!(f, "ADD_NEW"),
            ImportAction::Overwrite => write!(f, "OVERWRITE"),
            ImportAction::Skip => write!(f, "SKIP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_side_from_str() {
        assert_eq!("new".parse::<DatasetSide>(), Ok(DatasetSide::New));
        assert_eq!(" OLD ".parse::<DatasetSide>(), Ok(DatasetSide::Old));
        assert!("both".parse::<DatasetSide>().is_err());
    }

    #[test]
    fn test_project_mode_serde() {
        let json = serde_json::to_string(&ProjectMode::Composite).unwrap();
        assert_eq!(json, "\"COMPOSITE\"");
        let mode: ProjectMode = serde_json::from_str("\"STANDARD\"").unwrap();
        assert_eq!(mode, ProjectMode::Standard);
    }
}
