// ==========================================
// 设备数据集导入系统 - 引擎层
// ==========================================
// 职责: 场景统计、合并策略、来源追踪、提交编排
// 红线: 引擎不直接解析文件，不做持久化
// ==========================================

pub mod import_orchestrator;
pub mod merge;
pub mod provenance_tracker;
pub mod statistics;

// 重导出核心引擎
pub use import_orchestrator::{query_provenance, CommitResult, ImportOrchestrator};
pub use merge::{merge_into, CompositeMerge, KeyRemap, MergeOutcome, StandardMerge};
pub use provenance_tracker::ProvenanceTracker;
pub use statistics::{available_scenarios, is_uniform, statistics_by_scenario, type_counts, NO_SCENARIO};
