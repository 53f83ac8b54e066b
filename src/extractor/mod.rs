//! 提取模块：从HTML中提取script、meta与资源引用
pub mod html_extractor;

pub use self::html_extractor::HtmlExtractor;
