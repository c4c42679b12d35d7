// ==========================================
// 设备数据集导入系统 - 领域模型层
// ==========================================
// 职责: 定义数据集、复合键、类型注册表、项目与来源信息
// 红线: 不含文件解析逻辑，不含合并策略
// ==========================================

pub mod dataset;
pub mod import_record;
pub mod keys;
pub mod project;
pub mod provenance;
pub mod registry;
pub mod types;

// 重导出核心类型
pub use dataset::{
    Dataset, DatasetMetadata, EntryKey, EquipmentEntry, KeyingMismatch, TypeCollection,
};
pub use import_record::{ImportRecord, ScenarioMapping};
pub use keys::{dedup_scenarios, normalize_scenario, scenario_eq, CompositeKey};
pub use project::{ConfirmationRequired, DatasetSlot, Project, ProjectMetadata};
pub use provenance::{CompositeSource, ProvenanceInfo, ProvenanceTree};
pub use registry::{DataTypeDescriptor, DataTypeRegistry, Keying};
pub use types::{DatasetSide, ImportAction, ProjectMode};
