// ==========================================
// 设备数据集导入系统 - 来源追踪
// ==========================================
// 职责: 合并成功后，依据实际合并的暂存数据集（而非合并后的目标）
//       生成导入记录并更新来源信息
// 红线: 只登记本文件实际落地的 类型 / 目标场景，被跳过的场景不登记
// ==========================================

use crate::domain::dataset::{Dataset, TypeCollection};
use crate::domain::import_record::{ImportRecord, ScenarioMapping};
use crate::domain::provenance::ProvenanceInfo;
use crate::domain::types::ProjectMode;
use crate::engine::merge::{KeyRemap, MergeOutcome};
use tracing::debug;

pub struct ProvenanceTracker;

impl ProvenanceTracker {
    /// 由暂存数据集与重映射生成导入记录
    ///
    /// # 参数
    /// - file_path: 来源文件
    /// - mode: 提交时的项目模式
    /// - scratch: 本文件的暂存数据集
    /// - remap: 本文件使用的场景重映射
    /// - outcome: 合并结果（写入计数、被清空的类型）
    pub fn build_record(
        file_path: &str,
        mode: ProjectMode,
        scratch: &Dataset,
        remap: &KeyRemap,
        outcome: &MergeOutcome,
    ) -> ImportRecord {
        let mut record = ImportRecord::new(file_path, mode);
        record.type_counts = outcome.type_counts.clone();
        record.cleared_types = outcome.cleared_types.clone();

        for (data_type, collection) in scratch.collections() {
            if collection.is_empty() {
                continue;
            }
            match collection {
                TypeCollection::Simple(_) => {
                    if remap.includes_simple() {
                        record.simple_types.push(data_type.to_string());
                    }
                }
                TypeCollection::Scenario { .. } => {
                    for original in collection.scenario_labels() {
                        if let Some(target) = remap.resolve(&original) {
                            record.scenario_mappings.push(ScenarioMapping {
                                data_type: data_type.to_string(),
                                original_scenario: original,
                                target_scenario: target,
                            });
                        }
                    }
                }
            }
        }

        record
    }

    /// 登记导入记录（同一切片再次导入时覆盖而非追加）
    pub fn record_contribution(provenance: &mut ProvenanceInfo, record: &ImportRecord) {
        provenance.apply_record(record);
        debug!(
            file = %record.file_path,
            simple = record.simple_types.len(),
            scenarios = record.scenario_mappings.len(),
            "来源信息已更新"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{EntryKey, EquipmentEntry};
    use crate::domain::keys::CompositeKey;
    use crate::domain::registry::DataTypeDescriptor;

    fn scratch() -> Dataset {
        let mut scratch = Dataset::new();
        let arc = DataTypeDescriptor::scenario("ArcFlash");
        for scenario in ["Main-Min", "Main-Max"] {
            scratch
                .upsert(&arc, EntryKey::Scenario(CompositeKey::new("B1", scenario)), EquipmentEntry::new())
                .unwrap();
        }
        scratch
            .upsert(&DataTypeDescriptor::simple("Bus"), EntryKey::Simple("B1".into()), EquipmentEntry::new())
            .unwrap();
        scratch
    }

    #[test]
    fn test_record_only_contributed_scenarios() {
        let remap = KeyRemap::strict().rename("Main-Min", "Baseline").skip("Main-Max");
        let record = ProvenanceTracker::build_record(
            "a.csv",
            ProjectMode::Composite,
            &scratch(),
            &remap,
            &MergeOutcome::default(),
        );

        assert_eq!(record.simple_types, vec!["Bus"]);
        assert_eq!(record.scenario_mappings.len(), 1);
        assert_eq!(record.scenario_mappings[0].target_scenario, "Baseline");

        let mut provenance = ProvenanceInfo::default();
        ProvenanceTracker::record_contribution(&mut provenance, &record);
        let source = provenance.source_for_scenario("ArcFlash", "Baseline").unwrap();
        assert_eq!(source.original_scenario.as_deref(), Some("Main-Min"));
        assert!(provenance.source_for_scenario("ArcFlash", "Main-Max").is_none());
    }

    #[test]
    fn test_repeated_identical_import_is_idempotent() {
        let remap = KeyRemap::identity();
        let mut provenance = ProvenanceInfo::default();
        for _ in 0..3 {
            let record = ProvenanceTracker::build_record(
                "a.csv",
                ProjectMode::Composite,
                &scratch(),
                &remap,
                &MergeOutcome::default(),
            );
            ProvenanceTracker::record_contribution(&mut provenance, &record);
        }

        assert_eq!(provenance.data_type_sources.len(), 1);
        assert_eq!(provenance.composite_data_type_sources["ArcFlash"].len(), 2);
        assert_eq!(provenance.to_tree().leaf_count(), 3);
    }

    #[test]
    fn test_skipped_simple_types_not_attributed() {
        let remap = KeyRemap::strict().skip("Main-Min").skip("Main-Max").without_simple_types();
        let record = ProvenanceTracker::build_record(
            "a.csv",
            ProjectMode::Composite,
            &scratch(),
            &remap,
            &MergeOutcome::default(),
        );
        assert!(record.simple_types.is_empty());
        assert!(record.scenario_mappings.is_empty());
    }
}
