// ==========================================
// 设备数据集导入系统 - 复合导入计划
// ==========================================
// 职责: 根据扫描结果生成 (文件, 场景) 级导入计划，并校验用户编辑
// 红线: 计划存在错误行时禁止提交；不允许部分提交
// ==========================================

use crate::domain::keys::{dedup_scenarios, scenario_eq};
use crate::domain::types::ImportAction;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::scan::FileScanResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

// ==========================================
// ImportPlanRow - 计划行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlanRow {
    pub file_path: PathBuf,

    /// 该文件涉及的全部数据类型（用于同批次改名冲突判断）
    pub file_types: BTreeSet<String>,

    /// 原始场景标签；None 表示无场景维度的文件（整文件导入）
    pub original_scenario: Option<String>,

    pub entry_count: usize,
    pub action: ImportAction,

    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub overwrite_target: Option<String>,

    /// 校验错误（None 表示该行有效）
    #[serde(default)]
    pub error: Option<String>,
}

impl ImportPlanRow {
    fn scenario_row(scan: &FileScanResult, label: &str, action: ImportAction) -> Self {
        Self {
            file_path: scan.file_path.clone(),
            file_types: scan.data_types(),
            original_scenario: Some(label.to_string()),
            entry_count: scan.scenario_counts.get(label).copied().unwrap_or(0),
            action,
            new_name: Some(label.to_string()),
            overwrite_target: None,
            error: None,
        }
    }

    fn whole_file_row(scan: &FileScanResult) -> Self {
        Self {
            file_path: scan.file_path.clone(),
            file_types: scan.data_types(),
            original_scenario: None,
            entry_count: scan.total_entries(),
            action: ImportAction::AddNew,
            new_name: None,
            overwrite_target: None,
            error: None,
        }
    }

    pub fn is_whole_file(&self) -> bool {
        self.original_scenario.is_none()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// AddNew 行最终落地的场景名（未填新名时沿用原始标签）
    pub fn resolved_name(&self) -> Option<&str> {
        if self.action != ImportAction::AddNew {
            return None;
        }
        let original = self.original_scenario.as_deref()?;
        match self.new_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(name),
            _ => Some(original.trim()),
        }
    }

    /// 该行写入的目标场景（Skip 与整文件行为 None）
    pub fn target_scenario(&self) -> Option<&str> {
        match self.action {
            ImportAction::AddNew => self.resolved_name(),
            ImportAction::Overwrite => self
                .overwrite_target
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty()),
            ImportAction::Skip => None,
        }
    }

    fn shares_type_with(&self, other: &ImportPlanRow) -> bool {
        !self.file_types.is_disjoint(&other.file_types)
    }
}

// ==========================================
// ImportPlan - 导入计划
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlan {
    pub rows: Vec<ImportPlanRow>,

    /// 目标数据集中已有的场景标签
    pub existing_scenarios: Vec<String>,
}

impl ImportPlan {
    /// 生成默认计划
    ///
    /// # 参数
    /// - scans: 各文件扫描结果（顺序即提交顺序）
    /// - existing_scenarios: 目标数据集已有场景
    ///
    /// # 默认规则
    /// - 含场景的文件: 首个场景 AddNew（新名 = 原名），其余场景 Skip
    /// - 无场景的文件: 一行整文件导入
    pub fn build(scans: &[FileScanResult], existing_scenarios: &[String]) -> Self {
        let mut rows = Vec::new();
        for scan in scans {
            if !scan.is_scenario_file() {
                rows.push(ImportPlanRow::whole_file_row(scan));
                continue;
            }
            for (idx, label) in scan.scenarios.iter().enumerate() {
                let action = if idx == 0 {
                    ImportAction::AddNew
                } else {
                    ImportAction::Skip
                };
                rows.push(ImportPlanRow::scenario_row(scan, label, action));
            }
        }

        let mut plan = Self {
            rows,
            existing_scenarios: dedup_scenarios(existing_scenarios.iter()),
        };
        plan.validate();
        debug!(rows = plan.rows.len(), valid = plan.is_valid(), "导入计划已生成");
        plan
    }

    /// Standard 模式计划: 每个文件一行整文件导入
    pub fn whole_files(scans: &[FileScanResult]) -> Self {
        Self {
            rows: scans.iter().map(ImportPlanRow::whole_file_row).collect(),
            existing_scenarios: Vec::new(),
        }
    }

    // ==========================================
    // 校验
    // ==========================================

    /// 重新校验全部行，返回计划是否无错误
    pub fn validate(&mut self) -> bool {
        let errors: Vec<Option<String>> = (0..self.rows.len())
            .map(|idx| self.row_error(idx))
            .collect();
        for (row, error) in self.rows.iter_mut().zip(errors) {
            row.error = error;
        }
        self.is_valid()
    }

    fn row_error(&self, idx: usize) -> Option<String> {
        let row = &self.rows[idx];
        if row.is_whole_file() {
            return None;
        }

        match row.action {
            ImportAction::Skip => None,
            ImportAction::AddNew => {
                let name = row.resolved_name()?;
                if self.is_existing(name) {
                    return Some(format!("场景名 '{}' 已存在于目标数据集", name));
                }
                let clash = self.rows.iter().enumerate().any(|(other_idx, other)| {
                    other_idx != idx
                        && other.resolved_name().is_some_and(|n| scenario_eq(n, name))
                        && row.shares_type_with(other)
                });
                clash.then(|| format!("场景名 '{}' 与同批次其他行重复", name))
            }
            ImportAction::Overwrite => {
                let Some(target) = row.target_scenario() else {
                    return Some("未选择覆盖目标场景".to_string());
                };
                if !self.is_existing(target) {
                    return Some(format!("覆盖目标 '{}' 不存在于目标数据集", target));
                }
                let claims = self
                    .rows
                    .iter()
                    .filter(|other| {
                        other.action == ImportAction::Overwrite
                            && other.target_scenario().is_some_and(|t| scenario_eq(t, target))
                    })
                    .count();
                (claims > 1).then(|| format!("覆盖目标 '{}' 被多行同时选择", target))
            }
        }
    }

    fn is_existing(&self, label: &str) -> bool {
        self.existing_scenarios.iter().any(|s| scenario_eq(s, label))
    }

    /// 是否无错误行（不重新校验）
    pub fn is_valid(&self) -> bool {
        self.rows.iter().all(ImportPlanRow::is_valid)
    }

    /// 是否允许提交: 无错误行，且至少一行非 Skip（或含整文件行）
    pub fn can_commit(&self) -> bool {
        self.is_valid()
            && self
                .rows
                .iter()
                .any(|r| r.is_whole_file() || r.action != ImportAction::Skip)
    }

    pub fn invalid_rows(&self) -> impl Iterator<Item = &ImportPlanRow> {
        self.rows.iter().filter(|r| !r.is_valid())
    }

    // ==========================================
    // 行编辑（每次编辑后自动重新校验）
    // ==========================================

    pub fn set_action(&mut self, index: usize, action: ImportAction) -> ImportResult<()> {
        let existing = self.existing_scenarios.clone();
        let row = self.scenario_row_mut(index)?;
        row.action = action;
        if action == ImportAction::Overwrite && row.overwrite_target.is_none() {
            // 默认覆盖同名已有场景
            row.overwrite_target = row
                .original_scenario
                .as_deref()
                .and_then(|o| existing.iter().find(|s| scenario_eq(s, o)))
                .cloned();
        }
        self.validate();
        Ok(())
    }

    pub fn set_new_name(&mut self, index: usize, name: &str) -> ImportResult<()> {
        let row = self.scenario_row_mut(index)?;
        row.new_name = Some(name.trim().to_string());
        self.validate();
        Ok(())
    }

    pub fn set_overwrite_target(&mut self, index: usize, target: &str) -> ImportResult<()> {
        let row = self.scenario_row_mut(index)?;
        row.overwrite_target = Some(target.trim().to_string());
        self.validate();
        Ok(())
    }

    /// 从计划中移除某文件的全部行，返回移除行数
    pub fn remove_file(&mut self, file_path: &Path) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| r.file_path != file_path);
        self.validate();
        before - self.rows.len()
    }

    fn scenario_row_mut(&mut self, index: usize) -> ImportResult<&mut ImportPlanRow> {
        let total = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| ImportError::PlanInvalid(format!("行号越界: {} (共 {} 行)", index, total)))?;
        if row.is_whole_file() {
            return Err(ImportError::PlanInvalid(format!(
                "文件 {} 无场景维度，不能编辑场景动作",
                row.file_path.display()
            )));
        }
        Ok(row)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 计划涉及的文件（保持首次出现顺序）
    pub fn files(&self) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.file_path.clone()))
            .map(|r| r.file_path.clone())
            .collect()
    }

    pub fn rows_for_file<'a>(&'a self, file_path: &'a Path) -> impl Iterator<Item = &'a ImportPlanRow> {
        self.rows.iter().filter(move |r| r.file_path == file_path)
    }

    /// 某文件是否有需要写入的内容
    pub fn file_is_active(&self, file_path: &Path) -> bool {
        self.rows_for_file(file_path)
            .any(|r| r.is_whole_file() || r.action != ImportAction::Skip)
    }
}
