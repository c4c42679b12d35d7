// ==========================================
// 设备数据集导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 单文件错误（收集后继续批次）/ 系统性错误（中止或保守回退）
// ==========================================

use crate::domain::dataset::KeyingMismatch;
use crate::domain::project::ConfirmationRequired;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（单文件级）=====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx/.xls/.xlsm/.ods）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 数据映射错误（单文件级）=====
    #[error("字段映射失败 (表 {table}, 行 {row}): {message}")]
    FieldMappingError {
        table: String,
        row: usize,
        message: String,
    },

    // ===== 配置错误（系统性）=====
    #[error("映射配置无效: {}", .0.join("; "))]
    MappingInvalid(Vec<String>),

    // ===== 数据模型错误（系统性）=====
    #[error(transparent)]
    KeyingMismatch(#[from] KeyingMismatch),

    // ===== 导入计划错误 =====
    #[error("导入计划校验未通过: {0}")]
    PlanInvalid(String),

    #[error(transparent)]
    ConfirmationRequired(#[from] ConfirmationRequired),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为单文件级错误（收集后不影响批次内其他文件）
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::FieldMappingError { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_level_classification() {
        assert!(ImportError::FileNotFound("a.csv".into()).is_file_level());
        assert!(ImportError::CsvParseError("bad".into()).is_file_level());
        assert!(!ImportError::MappingInvalid(vec!["x".into()]).is_file_level());
        assert!(!ImportError::InternalError("boom".into()).is_file_level());
    }

    #[test]
    fn test_io_error_is_file_level() {
        let err: ImportError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(err.is_file_level());
    }
}
