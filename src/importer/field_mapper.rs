// ==========================================
// 设备数据集导入系统 - 字段映射器实现
// ==========================================
// 职责: 原始表格行 → (条目键, 设备条目)
// 列名匹配大小写不敏感；值已由文件解析器 TRIM
// ==========================================

use crate::config::TypeMapping;
use crate::domain::dataset::{EntryKey, EquipmentEntry};
use crate::domain::keys::CompositeKey;
use crate::domain::registry::{DataTypeDescriptor, Keying};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::parser_trait::RawTable;
use std::collections::HashMap;
use tracing::debug;

/// 已解析到实际表头的映射
#[derive(Debug, Clone)]
pub struct ResolvedMapping<'a> {
    pub descriptor: &'a DataTypeDescriptor,
    pub id_column: String,
    pub secondary_column: Option<String>,
    pub scenario_column: Option<String>,
    /// (字段名, 实际列名)
    pub fields: Vec<(String, String)>,
}

pub struct FieldMapper;

impl FieldMapper {
    /// 判断映射是否适用于该表，并解析实际列名
    ///
    /// # 返回
    /// - Some: 工作表匹配且所需键列齐全
    /// - None: 不适用（工作表不符、缺主标识列或缺键控所需列）
    pub fn resolve<'a>(
        &self,
        table: &RawTable,
        mapping: &TypeMapping,
        descriptor: &'a DataTypeDescriptor,
    ) -> Option<ResolvedMapping<'a>> {
        if let Some(sheet) = mapping.sheet.as_deref() {
            if !sheet.trim().eq_ignore_ascii_case(table.name.trim()) {
                return None;
            }
        }

        let id_column = table.resolve_column(&mapping.id_column)?.to_string();

        let (secondary_column, scenario_column) = match descriptor.keying {
            Keying::Simple => (None, None),
            Keying::Scenario { has_secondary } => {
                let scenario = table
                    .resolve_column(mapping.scenario_column.as_deref()?)?
                    .to_string();
                let secondary = if has_secondary {
                    Some(
                        table
                            .resolve_column(mapping.secondary_column.as_deref()?)?
                            .to_string(),
                    )
                } else {
                    None
                };
                (secondary, Some(scenario))
            }
        };

        let fields = mapping
            .fields
            .iter()
            .filter_map(|(field, column)| {
                let resolved = table.resolve_column(column);
                if resolved.is_none() {
                    debug!(table = %table.name, field = %field, column = %column, "字段列不存在，跳过");
                }
                resolved.map(|c| (field.clone(), c.to_string()))
            })
            .collect();

        Some(ResolvedMapping {
            descriptor,
            id_column,
            secondary_column,
            scenario_column,
            fields,
        })
    }

    /// 映射单行
    pub fn map_row(
        &self,
        resolved: &ResolvedMapping<'_>,
        table_name: &str,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<(EntryKey, EquipmentEntry)> {
        let id = required(row, &resolved.id_column, table_name, row_number)?;

        let key = match resolved.descriptor.keying {
            Keying::Simple => EntryKey::Simple(id),
            Keying::Scenario { .. } => {
                let scenario_column = resolved.scenario_column.as_deref().unwrap_or_default();
                let scenario = required(row, scenario_column, table_name, row_number)?;
                let secondary_id = match resolved.secondary_column.as_deref() {
                    Some(column) => Some(required(row, column, table_name, row_number)?),
                    None => None,
                };
                EntryKey::Scenario(CompositeKey {
                    id,
                    secondary_id,
                    scenario,
                })
            }
        };

        let mut entry = EquipmentEntry::new();
        for (field, column) in &resolved.fields {
            if let Some(value) = row.get(column) {
                entry.fields.insert(field.clone(), value.clone());
            }
        }

        Ok((key, entry))
    }
}

/// 提取必填键分量（空值视为缺失）
fn required(
    row: &HashMap<String, String>,
    column: &str,
    table_name: &str,
    row_number: usize,
) -> ImportResult<String> {
    row.get(column)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ImportError::FieldMappingError {
            table: table_name.to_string(),
            row: row_number,
            message: format!("键列 {} 为空", column),
        })
}
