//! 全局指纹库单例管理
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::compiler::SignalCatalog;
use crate::error::{FingerprintError, FpResult};
use crate::rule::CatalogLoader;

/// 全局指纹库实例
static GLOBAL_CATALOG: Lazy<OnceCell<Arc<SignalCatalog>>> = Lazy::new(OnceCell::new);

/// 初始化全局指纹库（内置规则）
pub async fn init_global_catalog() -> FpResult<Arc<SignalCatalog>> {
    init_global_catalog_with(CatalogLoader::new()).await
}

/// 用自定义加载器初始化全局指纹库，已初始化时直接返回现有实例
pub async fn init_global_catalog_with(loader: CatalogLoader) -> FpResult<Arc<SignalCatalog>> {
    let catalog = GLOBAL_CATALOG
        .get_or_try_init(|| async move {
            let catalog = loader.load().await?;
            info!("全局指纹库初始化完成，规则总数：{}", catalog.rule_count());
            Ok::<_, FingerprintError>(Arc::new(catalog))
        })
        .await?;
    Ok(catalog.clone())
}

/// 获取全局指纹库
pub fn global_catalog() -> FpResult<Arc<SignalCatalog>> {
    GLOBAL_CATALOG
        .get()
        .cloned()
        .ok_or(FingerprintError::CatalogNotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let first = init_global_catalog().await.unwrap();
        let second = init_global_catalog_with(CatalogLoader::empty()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &global_catalog().unwrap()));
        assert!(first.rule_count() > 0);
    }
}
