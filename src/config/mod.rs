// ==========================================
// CSV 配置化导入系统 - 配置层
// ==========================================
// 职责: 系统级默认配置的读取与覆写
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::ConfigManager;
pub use import_config_trait::ImportConfigReader;
