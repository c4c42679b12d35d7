// ==========================================
// 设备数据集导入系统 - 预扫描冲突检测
// ==========================================
// 职责: 提交前判断候选文件是否会触及目标数据集中已有数据的类型
// 失败策略: 单文件解析失败记录后跳过（允许部分扫描）；
//           扫描机制本身出错时保守回退为"将覆盖 Unknown"
// ==========================================

use crate::config::MappingConfig;
use crate::domain::dataset::Dataset;
use crate::importer::error::ImportResult;
use crate::importer::parser_trait::DatasetParser;
use crate::logging::ImportContext;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::instrument;

/// 系统性失败时的受影响类型占位
pub const UNKNOWN_AFFECTED_TYPE: &str = "Unknown";

// ==========================================
// ConflictResult - 冲突检测结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    pub will_overwrite: bool,
    /// 形如 "Bus (10 existing)"
    pub affected_types: Vec<String>,
}

impl ConflictResult {
    /// 保守结果: 假定全部会被覆盖，迫使调用方给出警告
    pub fn conservative() -> Self {
        Self {
            will_overwrite: true,
            affected_types: vec![UNKNOWN_AFFECTED_TYPE.to_string()],
        }
    }
}

pub struct ConflictDetector;

impl ConflictDetector {
    /// 预扫描
    ///
    /// # 参数
    /// - parser: 解析协作方
    /// - files: 候选文件
    /// - mapping: 字段映射配置
    /// - target: 目标数据集（只读）
    /// - ctx: 导入上下文（记录跳过的文件与系统性失败）
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn pre_scan(
        &self,
        parser: &dyn DatasetParser,
        files: &[PathBuf],
        mapping: &MappingConfig,
        target: &Dataset,
        ctx: &mut ImportContext,
    ) -> ConflictResult {
        match self.try_pre_scan(parser, files, mapping, target, ctx) {
            Ok(result) => result,
            Err(e) => {
                ctx.error(None, format!("冲突检测失败，按全部覆盖处理: {}", e));
                ConflictResult::conservative()
            }
        }
    }

    fn try_pre_scan(
        &self,
        parser: &dyn DatasetParser,
        files: &[PathBuf],
        mapping: &MappingConfig,
        target: &Dataset,
        ctx: &mut ImportContext,
    ) -> ImportResult<ConflictResult> {
        // 所有文件解析到同一暂存数据集
        let mut scratch = Dataset::new();
        for file_path in files {
            let file_label = file_path.display().to_string();
            match parser.import(file_path, mapping, &mut scratch) {
                Ok(written) => {
                    tracing::debug!(file = %file_label, written, "预扫描文件完成");
                }
                Err(e) if e.is_file_level() => {
                    ctx.warn(Some(&file_label), format!("预扫描跳过文件: {}", e));
                }
                Err(e) => return Err(e),
            }
        }

        let affected_types = Self::detect_overlap(&scratch, target);
        Ok(ConflictResult {
            will_overwrite: !affected_types.is_empty(),
            affected_types,
        })
    }

    /// 暂存与目标中均有数据的类型
    pub fn detect_overlap(scratch: &Dataset, target: &Dataset) -> Vec<String> {
        scratch
            .collections()
            .filter(|(_, collection)| !collection.is_empty())
            .filter_map(|(name, _)| {
                let existing = target.type_count(name);
                (existing > 0).then(|| format!("{} ({} existing)", name, existing))
            })
            .collect()
    }
}
