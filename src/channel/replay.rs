//! 回放渲染器：按URL返回预先录制的渲染结果，不启动浏览器

use std::collections::HashMap;
use async_trait::async_trait;
use url::Url;

use super::render::{RenderTrace, RenderedContentProvider};
use super::ChannelFailure;
use crate::error::FpResult;

#[derive(Debug, Clone, Default)]
pub struct ReplayRenderer {
    traces: HashMap<String, RenderTrace>,
}

impl ReplayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 录制一条结果，URL按规范化后的形式作为键
    pub fn with_trace(mut self, url: &Url, trace: RenderTrace) -> Self {
        self.traces.insert(url.as_str().to_string(), trace);
        self
    }

    /// 从JSON对象（URL -> RenderTrace）加载录制结果
    pub fn from_json(json: &str) -> FpResult<Self> {
        let raw: HashMap<String, RenderTrace> = serde_json::from_str(json)?;
        let mut traces = HashMap::with_capacity(raw.len());
        for (url, trace) in raw {
            traces.insert(Url::parse(&url)?.as_str().to_string(), trace);
        }
        Ok(Self { traces })
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

#[async_trait]
impl RenderedContentProvider for ReplayRenderer {
    async fn render(&self, url: &Url) -> Result<RenderTrace, ChannelFailure> {
        self.traces
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ChannelFailure::rendered(format!("no recorded trace for {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_by_url() {
        let url = Url::parse("https://example.com").unwrap();
        let renderer = ReplayRenderer::new().with_trace(
            &url,
            RenderTrace {
                dom: "<div ng-version=\"17\"></div>".into(),
                ..Default::default()
            },
        );

        let trace = renderer.render(&Url::parse("https://example.com/").unwrap()).await.unwrap();
        assert!(trace.dom.contains("ng-version"));

        let other = Url::parse("https://other.example/").unwrap();
        assert!(renderer.render(&other).await.is_err());
    }

    #[test]
    fn test_from_json() {
        let renderer = ReplayRenderer::from_json(r#"{"http://a.test": {"console": ["ko.observable ready"]}}"#).unwrap();
        assert_eq!(renderer.len(), 1);

        assert!(ReplayRenderer::from_json("[]").is_err());
    }
}
