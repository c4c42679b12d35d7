// ==========================================
// 设备数据集导入系统 - 文件预扫描
// ==========================================
// 职责: 将单个文件解析到独立暂存数据集并汇总
//       （发现的场景、各场景条目数、涉及的数据类型）
// 暂存数据集在汇总后即丢弃
// ==========================================

use crate::config::MappingConfig;
use crate::domain::dataset::Dataset;
use crate::engine::statistics::type_counts;
use crate::importer::error::ImportResult;
use crate::importer::parser_trait::DatasetParser;
use crate::logging::ImportContext;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::instrument;

// ==========================================
// FileScanResult - 单文件扫描结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileScanResult {
    pub file_path: PathBuf,

    /// 非空数据类型 → 条目数
    pub type_counts: BTreeMap<String, usize>,

    /// 发现的场景标签（大小写不敏感去重，按解析器首次写入顺序，首项即"首个发现的场景"）
    pub scenarios: Vec<String>,

    /// 场景 → 条目数（跨全部场景型类型）
    pub scenario_counts: BTreeMap<String, usize>,

    /// 场景 → 贡献该场景的场景型数据类型
    pub scenario_types: BTreeMap<String, BTreeSet<String>>,
}

impl FileScanResult {
    /// 从暂存数据集汇总
    pub fn from_scratch(file_path: &Path, scratch: &Dataset) -> Self {
        let scenarios = scratch.discovered_scenarios();

        let mut scenario_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut scenario_types: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for label in &scenarios {
            for (type_name, collection) in scratch.collections() {
                let count = collection.count_for_scenario(label);
                if count > 0 {
                    *scenario_counts.entry(label.clone()).or_default() += count;
                    scenario_types
                        .entry(label.clone())
                        .or_default()
                        .insert(type_name.to_string());
                }
            }
        }

        Self {
            file_path: file_path.to_path_buf(),
            type_counts: type_counts(scratch),
            scenarios,
            scenario_counts,
            scenario_types,
        }
    }

    /// 是否包含场景维度
    pub fn is_scenario_file(&self) -> bool {
        !self.scenarios.is_empty()
    }

    pub fn data_types(&self) -> BTreeSet<String> {
        self.type_counts.keys().cloned().collect()
    }

    pub fn total_entries(&self) -> usize {
        self.type_counts.values().sum()
    }
}

/// 扫描失败的文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file_path: PathBuf,
    pub message: String,
}

/// 批量扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanBatch {
    pub results: Vec<FileScanResult>,
    pub errors: Vec<FileError>,
}

/// 扫描单个文件
pub fn scan_file(
    parser: &dyn DatasetParser,
    file_path: &Path,
    mapping: &MappingConfig,
) -> ImportResult<FileScanResult> {
    let mut scratch = Dataset::new();
    parser.import(file_path, mapping, &mut scratch)?;
    Ok(FileScanResult::from_scratch(file_path, &scratch))
}

/// 顺序扫描多个文件；单文件失败记录后继续
#[instrument(skip_all, fields(files = files.len()))]
pub fn scan_files(
    parser: &dyn DatasetParser,
    files: &[PathBuf],
    mapping: &MappingConfig,
    ctx: &mut ImportContext,
) -> ScanBatch {
    let mut batch = ScanBatch::default();

    for file_path in files {
        let file_label = file_path.display().to_string();
        match scan_file(parser, file_path, mapping) {
            Ok(result) => {
                ctx.info(
                    Some(&file_label),
                    format!(
                        "扫描完成: {} 条, {} 个场景",
                        result.total_entries(),
                        result.scenarios.len()
                    ),
                );
                batch.results.push(result);
            }
            Err(e) => {
                ctx.error(Some(&file_label), format!("扫描失败: {}", e));
                batch.errors.push(FileError {
                    file_path: file_path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    batch
}
