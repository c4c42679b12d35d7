// ==========================================
// 设备数据集导入系统 - 核心库
// ==========================================
// 职责: 将外部电力分析工具导出的设备数据文件，按场景
//       增量合并到项目的 new/old 两份数据集，并追踪数据来源
// 流水线: 预扫描 → 生成计划 → 校验 → 提交
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 数据集、复合键、项目
pub mod domain;

// 配置层 - 字段映射配置
pub mod config;

// 导入层 - 解析、扫描、冲突检测、计划
pub mod importer;

// 引擎层 - 统计、合并、来源追踪
pub mod engine;

// 数据仓储层 - 项目文档存储
pub mod repository;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统与导入上下文
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CompositeKey, DataTypeRegistry, Dataset, DatasetSide, EntryKey, EquipmentEntry,
    ImportAction, Project, ProjectMode, ProvenanceInfo,
};

// 导入流水线
pub use importer::{
    ConflictDetector, ConflictResult, DatasetParser, ImportError, ImportPlan, ImportPlanRow,
    TabularDatasetParser,
};

// 引擎
pub use engine::{CommitResult, ImportOrchestrator};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "设备数据集导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
