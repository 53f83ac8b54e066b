//! 渲染抓取（通道B）能力抽象

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ChannelFailure;

/// 渲染后页面中的一个script元素
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedScript {
    pub src: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// 一次渲染的全部观测结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTrace {
    /// 渲染过程中每个网络响应的Header集合
    #[serde(default)]
    pub responses: Vec<Vec<(String, String)>>,
    /// 序列化后的DOM
    #[serde(default)]
    pub dom: String,
    #[serde(default)]
    pub scripts: Vec<RenderedScript>,
    /// 控制台输出
    #[serde(default)]
    pub console: Vec<String>,
}

/// 渲染内容提供者
#[async_trait]
pub trait RenderedContentProvider: Send + Sync {
    async fn render(&self, url: &Url) -> Result<RenderTrace, ChannelFailure>;
}

/// 禁用渲染通道（无浏览器环境使用），每次渲染都失败
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

#[async_trait]
impl RenderedContentProvider for DisabledRenderer {
    async fn render(&self, _url: &Url) -> Result<RenderTrace, ChannelFailure> {
        Err(ChannelFailure::rendered("render channel disabled"))
    }
}
