//! 取数通道：直连抓取（通道A）与渲染抓取（通道B）
pub mod target;
pub mod direct;
pub mod render;
pub mod replay;
#[cfg(feature = "browser")]
pub mod browser;

use std::fmt;
use std::sync::Arc;
#[cfg(feature = "browser")]
use tracing::warn;

use crate::config::FingerprintConfig;
use crate::detector::Channel;

/// 单个通道的失败记录，在通道边界就地恢复，不向上传播
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub reason: String,
}

impl ChannelFailure {
    pub fn new(channel: Channel, reason: impl Into<String>) -> Self {
        Self {
            channel,
            reason: reason.into(),
        }
    }

    pub fn direct(reason: impl Into<String>) -> Self {
        Self::new(Channel::Direct, reason)
    }

    pub fn rendered(reason: impl Into<String>) -> Self {
        Self::new(Channel::Rendered, reason)
    }
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.channel, self.reason)
    }
}

pub use self::target::Target;
pub use self::direct::{DirectFetcher, FetchedDocument};
pub use self::render::{DisabledRenderer, RenderTrace, RenderedContentProvider, RenderedScript};
pub use self::replay::ReplayRenderer;
#[cfg(feature = "browser")]
pub use self::browser::HeadlessBrowserProvider;

/// 默认渲染通道：启用browser特性且浏览器能启动时使用无头浏览器，否则禁用
pub fn default_renderer(config: &FingerprintConfig) -> Arc<dyn RenderedContentProvider> {
    #[cfg(feature = "browser")]
    {
        match HeadlessBrowserProvider::new(config) {
            Ok(provider) => return Arc::new(provider),
            Err(e) => warn!("无头浏览器不可用，渲染通道已禁用：{}", e),
        }
    }
    #[cfg(not(feature = "browser"))]
    let _ = config;
    Arc::new(DisabledRenderer)
}
