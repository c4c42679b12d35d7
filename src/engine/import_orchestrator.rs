// ==========================================
// 设备数据集导入系统 - 导入编排器
// ==========================================
// 流程: 计划门禁 → 逐文件 解析到暂存 → 合并 → 生成导入记录 → 更新来源信息
// 失败策略: 单文件失败收集后继续；系统性失败立即返回
// 红线: 校验未通过的计划不允许任何部分提交
//       暂存数据集由当前文件独占，处理完即丢弃
// ==========================================

use crate::config::MappingConfig;
use crate::domain::dataset::Dataset;
use crate::domain::import_record::ImportRecord;
use crate::domain::project::DatasetSlot;
use crate::domain::provenance::{ProvenanceInfo, ProvenanceTree};
use crate::domain::types::ProjectMode;
use crate::engine::merge::{CompositeMerge, KeyRemap, StandardMerge};
use crate::engine::provenance_tracker::ProvenanceTracker;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::parser_trait::DatasetParser;
use crate::importer::planner::{ImportPlan, ImportPlanRow};
use crate::importer::scan::FileError;
use crate::logging::ImportContext;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

// ==========================================
// CommitResult - 提交结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitResult {
    /// 需要写入的文件数（全部 Skip 的文件不计）
    pub total_files: usize,
    pub success_count: usize,
    pub per_file_errors: Vec<FileError>,
    /// 写入条目总数
    pub merged_entries: usize,
    /// 本次提交追加到导入日志的记录
    pub records: Vec<ImportRecord>,
}

impl CommitResult {
    pub fn is_complete(&self) -> bool {
        self.per_file_errors.is_empty()
    }
}

// ==========================================
// ImportOrchestrator - 导入编排器
// ==========================================
pub struct ImportOrchestrator<'a> {
    parser: &'a dyn DatasetParser,
}

impl<'a> ImportOrchestrator<'a> {
    pub fn new(parser: &'a dyn DatasetParser) -> Self {
        Self { parser }
    }

    /// 提交导入计划
    ///
    /// # 参数
    /// - plan: 导入计划（提交前按计划自身的已有场景重新校验）
    /// - mode: 项目模式（决定合并策略）
    /// - slot: 目标数据集及其来源信息、导入日志
    /// - mapping: 字段映射配置
    /// - ctx: 导入上下文
    ///
    /// # 返回
    /// - Ok(CommitResult): 成功文件数与单文件错误列表
    /// - Err(PlanInvalid): 计划存在错误行或无可导入内容，未做任何修改
    /// - Err(其他): 系统性失败
    #[instrument(skip_all, fields(mode = %mode, rows = plan.rows.len()))]
    pub fn commit(
        &self,
        plan: &ImportPlan,
        mode: ProjectMode,
        slot: &mut DatasetSlot,
        mapping: &MappingConfig,
        ctx: &mut ImportContext,
    ) -> ImportResult<CommitResult> {
        // === 步骤 1: 计划门禁（重新校验，行上的错误标记可能已过期） ===
        let mut checked = plan.clone();
        checked.validate();
        let plan = &checked;
        if !plan.can_commit() {
            let reasons: Vec<String> = plan
                .invalid_rows()
                .map(|row| {
                    format!(
                        "{} [{}]: {}",
                        row.file_path.display(),
                        row.original_scenario.as_deref().unwrap_or("-"),
                        row.error.as_deref().unwrap_or("")
                    )
                })
                .collect();
            let message = if reasons.is_empty() {
                "没有需要导入的内容".to_string()
            } else {
                reasons.join("; ")
            };
            ctx.error(None, format!("拒绝提交: {}", message));
            return Err(ImportError::PlanInvalid(message));
        }

        // === 步骤 2: 逐文件处理 ===
        let mut result = CommitResult::default();
        let mut standard = StandardMerge::new();

        for file_path in plan.files() {
            if !plan.file_is_active(&file_path) {
                continue;
            }
            result.total_files += 1;
            let file_label = file_path.display().to_string();

            let mut scratch = Dataset::new();
            if let Err(e) = self.parser.import(&file_path, mapping, &mut scratch) {
                if !e.is_file_level() {
                    return Err(e);
                }
                ctx.error(Some(&file_label), format!("导入失败: {}", e));
                result.per_file_errors.push(FileError {
                    file_path: file_path.clone(),
                    message: e.to_string(),
                });
                continue;
            }

            let rows: Vec<&ImportPlanRow> = plan.rows_for_file(&file_path).collect();
            let (remap, outcome) = match mode {
                ProjectMode::Standard => {
                    (KeyRemap::identity(), standard.apply(&scratch, &mut slot.dataset)?)
                }
                ProjectMode::Composite => (
                    KeyRemap::from_rows(rows.iter().copied()),
                    CompositeMerge::apply(&scratch, &mut slot.dataset, &rows)?,
                ),
            };

            // === 步骤 3: 导入记录与来源信息 ===
            let mut record =
                ProvenanceTracker::build_record(&file_label, mode, &scratch, &remap, &outcome);
            record.mapping_name = mapping.name.clone();
            ProvenanceTracker::record_contribution(&mut slot.provenance, &record);
            slot.import_log.push(record.clone());

            ctx.info(
                Some(&file_label),
                format!(
                    "已合并 {} 条（替换 {} 条，清除 {} 条，跳过 {} 条）",
                    outcome.written, outcome.replaced, outcome.removed, outcome.dropped
                ),
            );
            result.merged_entries += outcome.written;
            result.success_count += 1;
            result.records.push(record);
        }

        info!(
            total_files = result.total_files,
            success_count = result.success_count,
            merged_entries = result.merged_entries,
            "导入提交完成"
        );
        Ok(result)
    }
}

/// 查询来源树（文件 → 类型 → 场景）
///
/// 来源信息缺失而最近一次清空之后仍有导入记录时，由这些记录重建后返回。
pub fn query_provenance(slot: &DatasetSlot) -> ProvenanceTree {
    let live = slot.live_records();
    if slot.provenance.is_empty() && !live.is_empty() {
        return ProvenanceInfo::rebuild_from_records(live).to_tree();
    }
    slot.provenance.to_tree()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{EntryKey, EquipmentEntry};
    use crate::domain::keys::CompositeKey;
    use crate::domain::registry::DataTypeDescriptor;
    use crate::domain::types::ImportAction;
    use crate::importer::scan::scan_file;
    use std::path::{Path, PathBuf};

    /// 按文件名生成固定内容
    struct FixtureParser;

    impl DatasetParser for FixtureParser {
        fn import(
            &self,
            file_path: &Path,
            _mapping: &MappingConfig,
            target: &mut Dataset,
        ) -> ImportResult<usize> {
            let arc = DataTypeDescriptor::scenario("ArcFlash");
            let mut written = 0;
            match file_path.to_str().unwrap_or("") {
                "study.csv" => {
                    for scenario in ["Main-Min", "Main-Max"] {
                        for i in 0..3 {
                            target.upsert(
                                &arc,
                                EntryKey::Scenario(CompositeKey::new(format!("B{}", i), scenario)),
                                EquipmentEntry::new(),
                            )?;
                            written += 1;
                        }
                    }
                }
                "bus.csv" => {
                    target.upsert(
                        &DataTypeDescriptor::simple("Bus"),
                        EntryKey::Simple("B0".into()),
                        EquipmentEntry::new(),
                    )?;
                    written += 1;
                }
                other => return Err(ImportError::FileNotFound(other.to_string())),
            }
            Ok(written)
        }
    }

    fn plan_for(files: &[&str], slot: &DatasetSlot) -> ImportPlan {
        let scans: Vec<_> = files
            .iter()
            .filter_map(|f| scan_file(&FixtureParser, Path::new(f), &MappingConfig::default()).ok())
            .collect();
        let existing = crate::engine::statistics::available_scenarios(&slot.dataset);
        ImportPlan::build(&scans, &existing)
    }

    #[test]
    fn test_commit_first_scenario_by_default() {
        let mut slot = DatasetSlot::default();
        let plan = plan_for(&["study.csv"], &slot);
        let mut ctx = ImportContext::new();

        let result = ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.merged_entries, 3);
        let counts = slot.dataset.collection("ArcFlash").unwrap().scenario_counts();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["Main-Min"], 3);
        assert_eq!(slot.import_log.len(), 1);
    }

    #[test]
    fn test_commit_collects_per_file_errors() {
        let mut slot = DatasetSlot::default();
        let mut plan = plan_for(&["bus.csv"], &slot);
        plan.rows.push(ImportPlanRow {
            file_path: PathBuf::from("gone.csv"),
            ..plan.rows[0].clone()
        });
        let mut ctx = ImportContext::new();

        let result = ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Standard, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap();

        assert_eq!(result.total_files, 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.per_file_errors.len(), 1);
        assert_eq!(slot.dataset.type_count("Bus"), 1);
        assert!(ctx.has_errors());
    }

    #[test]
    fn test_invalid_plan_is_refused_without_changes() {
        let mut slot = DatasetSlot::default();
        let mut plan = plan_for(&["study.csv"], &slot);
        plan.set_action(0, ImportAction::Skip).unwrap();
        let mut ctx = ImportContext::new();

        let err = ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap_err();

        assert!(matches!(err, ImportError::PlanInvalid(_)));
        assert!(slot.dataset.is_empty());
        assert!(slot.import_log.is_empty());
    }

    #[test]
    fn test_directly_edited_plan_is_revalidated() {
        let mut slot = DatasetSlot::default();
        let mut plan = plan_for(&["study.csv"], &slot);
        // 绕过编辑方法直接改行，行上的错误标记仍为空
        plan.rows[1].action = ImportAction::AddNew;
        plan.rows[1].new_name = Some("main-min".to_string());
        assert!(plan.is_valid());
        let mut ctx = ImportContext::new();

        let err = ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap_err();

        assert!(matches!(err, ImportError::PlanInvalid(_)));
        assert!(slot.dataset.is_empty());
        assert!(slot.import_log.is_empty());
    }

    #[test]
    fn test_query_provenance_empty_after_clear() {
        let mut slot = DatasetSlot::default();
        let plan = plan_for(&["study.csv", "bus.csv"], &slot);
        let mut ctx = ImportContext::new();
        ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap();
        assert_eq!(query_provenance(&slot).files.len(), 2);

        slot.purge();
        assert!(slot.dataset.is_empty());
        assert_eq!(query_provenance(&slot), ProvenanceTree::default());
        assert_eq!(slot.import_log.len(), 2);

        // 清空后的新导入只重建自身来源
        let plan = plan_for(&["bus.csv"], &slot);
        ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap();
        slot.provenance = ProvenanceInfo::default();
        let tree = query_provenance(&slot);
        assert_eq!(tree.files.keys().collect::<Vec<_>>(), vec!["bus.csv"]);
    }

    #[test]
    fn test_query_provenance_rebuilds_from_log() {
        let mut slot = DatasetSlot::default();
        let plan = plan_for(&["study.csv", "bus.csv"], &slot);
        let mut ctx = ImportContext::new();
        ImportOrchestrator::new(&FixtureParser)
            .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
            .unwrap();

        let tree = query_provenance(&slot);
        slot.provenance = ProvenanceInfo::default();
        assert_eq!(query_provenance(&slot), tree);
        assert_eq!(tree.files.len(), 2);
    }
}
