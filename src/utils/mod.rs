//! 工具模块：提供通用工具函数
pub mod header_converter;
pub mod snippet;

pub use self::header_converter::HeaderConverter;
pub use self::snippet::{SnippetExtractor, SHORT_SNIPPET_MAX_LEN, SNIPPET_MAX_LEN};
