// ==========================================
// 设备数据集导入系统 - 字段映射配置
// ==========================================
// 职责: 描述"表格列 → 数据类型/键分量/字段"的映射
// 存储: JSON 文件
// 红线: 配置的合法性由 validate() 给出 {errors, warnings}，解析器只接受无 error 的配置
// ==========================================

use crate::domain::registry::{DataTypeRegistry, Keying};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    ReadError { path: String, message: String },

    #[error("配置文件格式错误 ({path}): {message}")]
    FormatError { path: String, message: String },

    #[error("映射配置校验失败: {0:?}")]
    Invalid(Vec<String>),
}

// ==========================================
// TypeMapping - 单个数据类型的映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// 目标数据类型（须在注册表中）
    pub data_type: String,

    /// 限定工作表/表名（CSV 为文件名主干），为空则匹配所有表
    #[serde(default)]
    pub sheet: Option<String>,

    /// 主标识列
    pub id_column: String,

    /// 次级标识列（如保护设备所在母线）
    #[serde(default)]
    pub secondary_column: Option<String>,

    /// 场景列
    #[serde(default)]
    pub scenario_column: Option<String>,

    /// 字段名 → 列名
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl TypeMapping {
    pub fn new(data_type: &str, id_column: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            sheet: None,
            id_column: id_column.to_string(),
            secondary_column: None,
            scenario_column: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_scenario_column(mut self, column: &str) -> Self {
        self.scenario_column = Some(column.to_string());
        self
    }

    pub fn with_secondary_column(mut self, column: &str) -> Self {
        self.secondary_column = Some(column.to_string());
        self
    }

    pub fn with_field(mut self, field: &str, column: &str) -> Self {
        self.fields.insert(field.to_string(), column.to_string());
        self
    }

    pub fn with_sheet(mut self, sheet: &str) -> Self {
        self.sheet = Some(sheet.to_string());
        self
    }
}

/// 校验结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// ==========================================
// MappingConfig - 映射配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeMapping>,
}

impl MappingConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, mapping: TypeMapping) -> Self {
        self.types.push(mapping);
        self
    }

    /// 从 JSON 文件加载
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::FormatError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 校验映射配置
    pub fn validate(&self, registry: &DataTypeRegistry) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.types.is_empty() {
            report.errors.push("映射配置未定义任何数据类型".to_string());
            return report;
        }

        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
        for mapping in &self.types {
            let type_name = mapping.data_type.trim();

            let Some(descriptor) = registry.get(type_name) else {
                report
                    .errors
                    .push(format!("未知数据类型: {}", mapping.data_type));
                continue;
            };

            let sheet_key = mapping.sheet.as_ref().map(|s| s.trim().to_lowercase());
            if !seen.insert((descriptor.name.to_lowercase(), sheet_key)) {
                report
                    .errors
                    .push(format!("数据类型重复映射: {}", descriptor.name));
            }

            if mapping.id_column.trim().is_empty() {
                report
                    .errors
                    .push(format!("{}: 主标识列为空", descriptor.name));
            }

            let has_scenario_column = non_blank(&mapping.scenario_column);
            let has_secondary_column = non_blank(&mapping.secondary_column);

            match descriptor.keying {
                Keying::Simple => {
                    if has_scenario_column {
                        report.warnings.push(format!(
                            "{}: 简单型数据类型不使用场景列，已忽略",
                            descriptor.name
                        ));
                    }
                    if has_secondary_column {
                        report.warnings.push(format!(
                            "{}: 简单型数据类型不使用次级标识列，已忽略",
                            descriptor.name
                        ));
                    }
                }
                Keying::Scenario { has_secondary } => {
                    if !has_scenario_column {
                        report
                            .errors
                            .push(format!("{}: 场景型数据类型缺少场景列", descriptor.name));
                    }
                    if has_secondary && !has_secondary_column {
                        report
                            .errors
                            .push(format!("{}: 缺少次级标识列", descriptor.name));
                    }
                    if !has_secondary && has_secondary_column {
                        report.warnings.push(format!(
                            "{}: 该数据类型无次级标识，次级标识列已忽略",
                            descriptor.name
                        ));
                    }
                }
            }

            if mapping.fields.is_empty() {
                report
                    .warnings
                    .push(format!("{}: 未映射任何字段列", descriptor.name));
            }
        }

        report
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}
