// ==========================================
// 设备数据集导入 API
// ==========================================
// 职责: 为外层（命令行/界面）封装 预扫描 → 计划 → 校验 → 提交 流水线
//       以及统计、来源查询、模式切换、数据集维护
// 约束: 每次写操作 读取项目 → 修改 → 保存；系统性失败时不保存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::MappingConfig;
use crate::domain::project::Project;
use crate::domain::provenance::ProvenanceTree;
use crate::domain::registry::DataTypeRegistry;
use crate::domain::types::{DatasetSide, ProjectMode};
use crate::engine::import_orchestrator::{query_provenance, CommitResult, ImportOrchestrator};
use crate::engine::statistics;
use crate::importer::conflict_detector::{ConflictDetector, ConflictResult};
use crate::importer::parser_trait::DatasetParser;
use crate::importer::planner::ImportPlan;
use crate::importer::scan::{self, FileScanResult, ScanBatch};
use crate::importer::tabular_parser::TabularDatasetParser;
use crate::logging::ImportContext;
use crate::repository::{ProjectRepository, SqliteProjectRepository};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// 库中尚无项目时使用的默认名称
pub const DEFAULT_PROJECT_NAME: &str = "Untitled";

/// 导入API
pub struct ImportApi {
    repo: Arc<dyn ProjectRepository>,
    parser: Box<dyn DatasetParser>,
    registry: DataTypeRegistry,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(
        repo: Arc<dyn ProjectRepository>,
        parser: Box<dyn DatasetParser>,
        registry: DataTypeRegistry,
    ) -> Self {
        Self {
            repo,
            parser,
            registry,
        }
    }

    /// 打开项目库，使用表格解析器与标准类型注册表
    pub fn open<P: AsRef<Path>>(db_path: P) -> ApiResult<Self> {
        let repo = SqliteProjectRepository::open(db_path)?;
        let registry = DataTypeRegistry::standard();
        Ok(Self::new(
            Arc::new(repo),
            Box::new(TabularDatasetParser::new(registry.clone())),
            registry,
        ))
    }

    // ==========================================
    // 项目读写
    // ==========================================

    /// 读取项目（库为空时返回新建的空项目，不落库）
    pub fn project(&self) -> ApiResult<Project> {
        Ok(self
            .repo
            .load()?
            .unwrap_or_else(|| Project::new(DEFAULT_PROJECT_NAME, &self.registry)))
    }

    pub fn save_project(&self, project: &Project) -> ApiResult<()> {
        self.repo.save(project)?;
        Ok(())
    }

    // ==========================================
    // 导入流水线
    // ==========================================

    /// 预扫描冲突检测
    pub fn pre_scan(
        &self,
        side: DatasetSide,
        files: &[PathBuf],
        mapping: &MappingConfig,
        ctx: &mut ImportContext,
    ) -> ApiResult<ConflictResult> {
        let project = self.project()?;
        Ok(ConflictDetector.pre_scan(
            self.parser.as_ref(),
            files,
            mapping,
            project.dataset(side),
            ctx,
        ))
    }

    /// 逐文件扫描（计划的输入）
    pub fn scan_files(
        &self,
        files: &[PathBuf],
        mapping: &MappingConfig,
        ctx: &mut ImportContext,
    ) -> ScanBatch {
        scan::scan_files(self.parser.as_ref(), files, mapping, ctx)
    }

    /// 生成默认导入计划
    ///
    /// Standard 模式下每个文件一行整文件导入；Composite 模式下按场景生成。
    pub fn build_plan(&self, side: DatasetSide, scans: &[FileScanResult]) -> ApiResult<ImportPlan> {
        let project = self.project()?;
        let plan = match project.mode() {
            ProjectMode::Standard => ImportPlan::whole_files(scans),
            ProjectMode::Composite => {
                let existing = statistics::available_scenarios(project.dataset(side));
                ImportPlan::build(scans, &existing)
            }
        };
        Ok(plan)
    }

    /// 重新校验计划（任意行编辑后可调用）
    pub fn validate_plan(&self, plan: &mut ImportPlan) -> bool {
        plan.validate()
    }

    /// 提交计划并保存项目
    pub fn commit(
        &self,
        side: DatasetSide,
        plan: &ImportPlan,
        mapping: &MappingConfig,
        ctx: &mut ImportContext,
    ) -> ApiResult<CommitResult> {
        let mut project = self.project()?;
        let mode = project.mode();
        let result = ImportOrchestrator::new(self.parser.as_ref()).commit(
            plan,
            mode,
            project.slot_mut(side),
            mapping,
            ctx,
        )?;

        if result.success_count > 0 {
            self.repo.save(&project)?;
        }
        info!(
            side = %side,
            success = result.success_count,
            total = result.total_files,
            "导入已提交"
        );
        Ok(result)
    }

    /// 来源树（文件 → 类型 → 场景）
    pub fn query_provenance(&self, side: DatasetSide) -> ApiResult<ProvenanceTree> {
        let project = self.project()?;
        Ok(query_provenance(project.slot(side)))
    }

    // ==========================================
    // 统计查询
    // ==========================================

    pub fn statistics(&self, side: DatasetSide) -> ApiResult<BTreeMap<String, BTreeMap<String, usize>>> {
        let project = self.project()?;
        Ok(statistics::statistics_by_scenario(project.dataset(side)))
    }

    pub fn available_scenarios(&self, side: DatasetSide) -> ApiResult<Vec<String>> {
        let project = self.project()?;
        Ok(statistics::available_scenarios(project.dataset(side)))
    }

    // ==========================================
    // 项目模式与数据集维护
    // ==========================================

    /// 切换项目模式（未确认时返回 ConfirmationRequired，不做修改）
    pub fn set_project_mode(&self, mode: ProjectMode, confirmed: bool) -> ApiResult<bool> {
        let mut project = self.project()?;
        let changed = project
            .set_mode(mode, confirmed)
            .map_err(|e| ApiError::ConfirmationRequired(e.to_string()))?;
        if changed {
            self.repo.save(&project)?;
        }
        Ok(changed)
    }

    pub fn clear_dataset(&self, side: DatasetSide) -> ApiResult<usize> {
        let mut project = self.project()?;
        let removed = project.clear_dataset(side);
        self.repo.save(&project)?;
        Ok(removed)
    }

    pub fn rename_scenario(&self, side: DatasetSide, old: &str, new: &str) -> ApiResult<usize> {
        if new.trim().is_empty() {
            return Err(ApiError::InvalidInput("新场景名不能为空".to_string()));
        }
        let mut project = self.project()?;
        if !project.dataset(side).has_scenario(old) {
            return Err(ApiError::NotFound(format!("场景 '{}'", old)));
        }
        let renamed = project.rename_scenario(side, old, new);
        self.repo.save(&project)?;
        Ok(renamed)
    }

    pub fn remove_scenario(&self, side: DatasetSide, label: &str) -> ApiResult<usize> {
        let mut project = self.project()?;
        if !project.dataset(side).has_scenario(label) {
            return Err(ApiError::NotFound(format!("场景 '{}'", label)));
        }
        let removed = project.remove_scenario(side, label);
        self.repo.save(&project)?;
        Ok(removed)
    }
}
