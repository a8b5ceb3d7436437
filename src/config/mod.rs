//! 属性配置模块
//!
//! 提供属性文件解析、默认文件定位和线程安全的属性存储

pub mod format;
pub mod loader;
pub mod store;

// 重新导出主要类型
pub use format::{parse_properties, serialize_properties};
pub use loader::{get_default_property_path, read_properties, read_property_file};
pub use store::ConfigStore;
