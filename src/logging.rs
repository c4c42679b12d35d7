// ==========================================
// 日志系统初始化 + 导入上下文
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// ImportContext: 显式传入各操作的结果上下文，
// 与正确性相关的信息（错误列表/计数）通过它返回，不依赖日志副作用
// ==========================================

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=equip_compare=trace
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// 上下文中的单条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub level: MessageLevel,
    #[serde(default)]
    pub file: Option<String>,
    pub message: String,
}

// ==========================================
// ImportContext - 导入操作上下文
// ==========================================
// 每次操作由调用方创建并独占；消息同时转发到 tracing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportContext {
    messages: Vec<ContextMessage>,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, file: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(file = file.unwrap_or("-"), "{}", message);
        self.push(MessageLevel::Info, file, message);
    }

    pub fn warn(&mut self, file: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(file = file.unwrap_or("-"), "{}", message);
        self.push(MessageLevel::Warning, file, message);
    }

    pub fn error(&mut self, file: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(file = file.unwrap_or("-"), "{}", message);
        self.push(MessageLevel::Error, file, message);
    }

    fn push(&mut self, level: MessageLevel, file: Option<&str>, message: String) {
        self.messages.push(ContextMessage {
            level,
            file: file.map(str::to_string),
            message,
        });
    }

    pub fn messages(&self) -> &[ContextMessage] {
        &self.messages
    }

    pub fn errors(&self) -> impl Iterator<Item = &ContextMessage> {
        self.messages
            .iter()
            .filter(|m| m.level == MessageLevel::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_collects_levels() {
        init_test();
        let mut ctx = ImportContext::new();
        ctx.info(None, "开始");
        ctx.warn(Some("a.csv"), "跳过一行");
        assert!(!ctx.has_errors());

        ctx.error(Some("b.csv"), "解析失败");
        assert!(ctx.has_errors());
        assert_eq!(ctx.messages().len(), 3);
        let errors: Vec<_> = ctx.errors().collect();
        assert_eq!(errors[0].file.as_deref(), Some("b.csv"));
    }
}
