//! 规则模块：负责指纹库的数据模型定义与加载
pub mod model;
pub mod loader;

// 导出核心接口
pub use self::model::{Category, RawCatalog, RawRenderTables};
pub use self::loader::{CatalogLoader, CatalogSource, EMBEDDED_CATALOG};
