// ==========================================
// 设备数据集导入系统 - 解析器 Trait
// ==========================================
// 职责: 定义外部解析协作方接口（不包含实现）
// 红线: 核心逻辑从不自行解析行数据，只通过 DatasetParser 填充暂存数据集
// ==========================================

use crate::config::MappingConfig;
use crate::domain::dataset::Dataset;
use crate::importer::error::ImportResult;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// DatasetParser Trait
// ==========================================
// 用途: 文件 + 映射配置 → 填充暂存数据集
// 实现者: TabularDatasetParser（测试中另有内存实现）
pub trait DatasetParser: Send + Sync {
    /// 解析文件并写入目标数据集
    ///
    /// # 参数
    /// - file_path: 源文件路径
    /// - mapping: 字段映射配置
    /// - target: 暂存数据集（同键写入覆盖）
    ///
    /// # 返回
    /// - Ok(usize): 写入的条目数
    /// - Err: I/O 错误、结构性解析错误、配置无效
    fn import(
        &self,
        file_path: &Path,
        mapping: &MappingConfig,
        target: &mut Dataset,
    ) -> ImportResult<usize>;
}

// ==========================================
// RawTable - 原始表格
// ==========================================
// CSV 文件对应一张表；Excel 每个工作表对应一张表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    /// 每行: 列名 → 值（已 TRIM，整行空白已跳过）
    pub rows: Vec<HashMap<String, String>>,
}

impl RawTable {
    pub fn has_column(&self, column: &str) -> bool {
        self.resolve_column(column).is_some()
    }

    /// 按大小写不敏感方式查找实际表头名
    pub fn resolve_column(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(column.trim()))
            .map(String::as_str)
    }
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件读取（阶段 0）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表格列表
    fn parse_to_tables(&self, file_path: &Path) -> ImportResult<Vec<RawTable>>;
}
