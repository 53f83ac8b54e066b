//! 指纹库加载管理器
//! 负责从内置数据、本地文件或调用方提供的 JSON 组装指纹库

use std::path::PathBuf;
use tracing::{debug, info};

use super::model::RawCatalog;
use crate::compiler::{CatalogCompiler, SignalCatalog};
use crate::error::{FingerprintError, FpResult};

/// 编译期嵌入的默认指纹库
pub const EMBEDDED_CATALOG: &str = include_str!("../../data/signal_catalog.json");

/// 指纹库来源
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Embedded,           // 内置指纹库
    LocalFile(PathBuf), // 本地 JSON 文件
    Inline(String),     // 调用方直接提供的 JSON 文本
}

/// 指纹库加载管理器
pub struct CatalogLoader {
    sources: Vec<CatalogSource>,
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self {
            sources: vec![CatalogSource::Embedded],
        }
    }
}

impl CatalogLoader {
    /// 仅使用内置指纹库
    pub fn new() -> Self {
        Self::default()
    }

    /// 不含任何来源的空加载器
    pub fn empty() -> Self {
        Self { sources: Vec::new() }
    }

    /// 追加一个来源，后加载的规则排在同类已有规则之后
    pub fn with_source(mut self, source: CatalogSource) -> Self {
        self.sources.push(source);
        self
    }

    /// 加载并编译全部来源，任一来源非法即整体失败
    pub async fn load(&self) -> FpResult<SignalCatalog> {
        let mut catalog = SignalCatalog::default();

        for source in &self.sources {
            let json = match source {
                CatalogSource::Embedded => EMBEDDED_CATALOG.to_string(),
                CatalogSource::LocalFile(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                    FingerprintError::CatalogConfig(format!("读取指纹库文件 {} 失败：{}", path.display(), e))
                })?,
                CatalogSource::Inline(json) => json.clone(),
            };
            let compiled = Self::compile_json(&json)?;
            debug!("Catalog source {:?} compiled: {} rules", source_label(source), compiled.rule_count());
            catalog.extend(compiled);
        }

        info!(
            "Signal catalog ready: {} sources, {} rules",
            self.sources.len(),
            catalog.rule_count()
        );
        Ok(catalog)
    }

    /// 同步编译单份 JSON 指纹库
    pub fn compile_json(json: &str) -> FpResult<SignalCatalog> {
        let raw: RawCatalog = serde_json::from_str(json)
            .map_err(|e| FingerprintError::CatalogConfig(format!("指纹库 JSON 非法：{}", e)))?;
        debug!("原始指纹表条目数：{}", raw.rule_count());
        CatalogCompiler::compile(&raw)
    }

    /// 同步编译内置指纹库
    pub fn embedded() -> FpResult<SignalCatalog> {
        Self::compile_json(EMBEDDED_CATALOG)
    }
}

fn source_label(source: &CatalogSource) -> String {
    match source {
        CatalogSource::Embedded => "embedded".to_string(),
        CatalogSource::LocalFile(path) => path.display().to_string(),
        CatalogSource::Inline(_) => "inline".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Signal;
    use crate::rule::Category;

    #[test]
    fn test_embedded_catalog_compiles() {
        let catalog = CatalogLoader::embedded().unwrap();
        assert!(catalog.rule_count() > 100);
        assert!(!catalog.weak_hints_for("Laravel").is_empty());
        assert_eq!(catalog.script_keys().len(), 10);
    }

    #[tokio::test]
    async fn test_inline_source_appends_after_embedded() {
        let catalog = CatalogLoader::new()
            .with_source(CatalogSource::Inline(r#"{"header": {"x-powered-by": "Generic Stack"}}"#.into()))
            .load()
            .await
            .unwrap();

        // 内置的门控规则已命中 x-powered-by，同名扁平规则被跳过
        let hits = catalog.matches(Category::Header, &Signal::Field { name: "x-powered-by", value: "Express" });
        let frameworks: Vec<&str> = hits.iter().map(|h| h.framework.as_str()).collect();
        assert_eq!(frameworks, vec!["Express.js"]);

        // 门控未命中时扁平规则兜底
        let hits = catalog.matches(Category::Header, &Signal::Field { name: "x-powered-by", value: "custom" });
        let frameworks: Vec<&str> = hits.iter().map(|h| h.framework.as_str()).collect();
        assert_eq!(frameworks, vec!["Generic Stack"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let err = CatalogLoader::empty()
            .with_source(CatalogSource::LocalFile(PathBuf::from("/nonexistent/catalog.json")))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, FingerprintError::CatalogConfig(_)));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = CatalogLoader::compile_json("{not json").unwrap_err();
        assert!(matches!(err, FingerprintError::CatalogConfig(_)));
    }
}
