// ==========================================
// 设备数据集导入系统 - 配置层
// ==========================================
// 职责: 字段映射配置的加载与校验
// 存储: JSON 文件
// ==========================================

pub mod mapping_config;

// 重导出核心配置类型
pub use mapping_config::{ConfigError, MappingConfig, TypeMapping, ValidationReport};

/// 覆盖默认项目文件路径的环境变量
pub const PROJECT_PATH_ENV: &str = "EQUIP_COMPARE_PROJECT_PATH";

/// 默认项目库路径
///
/// 优先级: 环境变量 EQUIP_COMPARE_PROJECT_PATH > 用户数据目录 > 当前目录
pub fn default_project_path() -> std::path::PathBuf {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(PROJECT_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("equip-compare");
            // 目录创建失败时由打开数据库时报告
            std::fs::create_dir_all(&dir).ok();
            dir.join("project.db")
        }
        None => PathBuf::from("./equip_compare_project.db"),
    }
}
