// ==========================================
// 设备数据集导入系统 - 表格数据集解析器
// ==========================================
// 职责: DatasetParser 的参考实现
// 流程: 校验映射配置 → 读取表格 → 按类型映射逐行写入暂存数据集
// ==========================================

use crate::config::MappingConfig;
use crate::domain::dataset::Dataset;
use crate::domain::registry::DataTypeRegistry;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::parser_trait::{DatasetParser, FileParser};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// ==========================================
// TabularDatasetParser - 表格数据集解析器
// ==========================================
pub struct TabularDatasetParser {
    registry: DataTypeRegistry,
    file_parser: Box<dyn FileParser>,
    field_mapper: FieldMapper,
}

impl TabularDatasetParser {
    /// 创建解析器（按扩展名自动选择 CSV/Excel）
    pub fn new(registry: DataTypeRegistry) -> Self {
        Self::with_file_parser(registry, Box::new(UniversalFileParser))
    }

    pub fn with_file_parser(registry: DataTypeRegistry, file_parser: Box<dyn FileParser>) -> Self {
        Self {
            registry,
            file_parser,
            field_mapper: FieldMapper,
        }
    }

    pub fn registry(&self) -> &DataTypeRegistry {
        &self.registry
    }
}

impl DatasetParser for TabularDatasetParser {
    #[instrument(skip(self, mapping, target), fields(file = %file_path.display()))]
    fn import(
        &self,
        file_path: &Path,
        mapping: &MappingConfig,
        target: &mut Dataset,
    ) -> ImportResult<usize> {
        // === 步骤 1: 校验映射配置 ===
        let report = mapping.validate(&self.registry);
        if !report.is_valid() {
            return Err(ImportError::MappingInvalid(report.errors));
        }
        for warning in &report.warnings {
            debug!(warning = %warning, "映射配置警告");
        }

        // === 步骤 2: 读取表格 ===
        let tables = self.file_parser.parse_to_tables(file_path)?;

        // === 步骤 3: 映射并写入 ===
        let mut written = 0;
        let mut skipped = 0;
        for table in &tables {
            for type_mapping in &mapping.types {
                let Some(descriptor) = self.registry.get(&type_mapping.data_type) else {
                    continue;
                };
                let Some(resolved) = self.field_mapper.resolve(table, type_mapping, descriptor)
                else {
                    debug!(table = %table.name, data_type = %descriptor.name, "表格不适用该映射");
                    continue;
                };

                for (idx, row) in table.rows.iter().enumerate() {
                    // 行号从 2 开始（第 1 行为表头）
                    match self
                        .field_mapper
                        .map_row(&resolved, &table.name, row, idx + 2)
                    {
                        Ok((key, entry)) => {
                            target.upsert(descriptor, key, entry)?;
                            written += 1;
                        }
                        Err(e) => {
                            warn!(data_type = %descriptor.name, error = %e, "行映射失败，已跳过");
                            skipped += 1;
                        }
                    }
                }
            }
        }

        info!(tables = tables.len(), written, skipped, "文件解析完成");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeMapping;
    use std::io::Write;
    use tempfile::Builder;

    fn mapping() -> MappingConfig {
        MappingConfig::new("test")
            .with_type(TypeMapping::new("Bus", "Bus Name").with_field("kV", "Base kV"))
            .with_type(
                TypeMapping::new("ArcFlash", "Bus Name")
                    .with_scenario_column("Scenario")
                    .with_field("IE", "Incident Energy"),
            )
    }

    #[test]
    fn test_import_csv_into_scratch() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Bus Name,Scenario,Incident Energy,Base kV").unwrap();
        writeln!(file, "SWGR-1,Main-Min,8.2,0.48").unwrap();
        writeln!(file, "SWGR-1,Main-Max,10.1,0.48").unwrap();
        writeln!(file, "SWGR-2,,3.3,0.48").unwrap();

        let parser = TabularDatasetParser::new(DataTypeRegistry::standard());
        let mut scratch = Dataset::new();
        let written = parser.import(file.path(), &mapping(), &mut scratch).unwrap();

        // Bus: 3 行写入 2 个键（SWGR-1 覆盖）；ArcFlash: 2 行（缺场景的一行跳过）
        assert_eq!(written, 5);
        assert_eq!(scratch.type_count("Bus"), 2);
        assert_eq!(scratch.type_count("ArcFlash"), 2);
    }

    #[test]
    fn test_import_rejects_invalid_mapping() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Bus Name").unwrap();

        let parser = TabularDatasetParser::new(DataTypeRegistry::standard());
        let bad = MappingConfig::new("bad").with_type(TypeMapping::new("Widget", "Name"));
        let err = parser
            .import(file.path(), &bad, &mut Dataset::new())
            .unwrap_err();

        assert!(matches!(err, ImportError::MappingInvalid(_)));
        assert!(!err.is_file_level());
    }

    #[test]
    fn test_import_missing_file_is_file_level() {
        let parser = TabularDatasetParser::new(DataTypeRegistry::standard());
        let err = parser
            .import(Path::new("missing.csv"), &mapping(), &mut Dataset::new())
            .unwrap_err();
        assert!(err.is_file_level());
    }
}
