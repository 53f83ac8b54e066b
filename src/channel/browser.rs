//! 无头浏览器渲染（headless_chrome）
//! CDP会话是阻塞调用，放在spawn_blocking中执行，外层再加一道总超时

use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Runtime::RemoteObject;
use headless_chrome::{Browser, LaunchOptions};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::render::{RenderTrace, RenderedContentProvider, RenderedScript};
use super::ChannelFailure;
use crate::config::FingerprintConfig;
use crate::error::{FingerprintError, FpResult};

// 浏览器空闲多久后自动退出
const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);
// 外层超时在页面超时与等待时间之外的余量
const OUTER_TIMEOUT_SLACK: Duration = Duration::from_secs(5);
const RESPONSE_HANDLER_NAME: &str = "rsfwprobe-response-headers";
const SCRIPTS_JS: &str = "JSON.stringify(Array.from(document.scripts).map(s => ({src: s.getAttribute('src'), text: s.textContent || ''})))";

// 当前浏览器实例及其代数，重启后代数加一
struct Slot<B> {
    generation: u64,
    browser: B,
}

/// 共享一个浏览器进程，每次渲染开一个标签页，结束后关闭
/// 浏览器崩溃或空闲退出后，下一次开标签页失败时重启一次
#[derive(Clone)]
pub struct HeadlessBrowserProvider {
    slot: Arc<Mutex<Slot<Browser>>>,
    headless: bool,
    page_timeout: Duration,
    settle_delay: Duration,
}

impl HeadlessBrowserProvider {
    pub fn new(config: &FingerprintConfig) -> FpResult<Self> {
        let browser = launch(config.headless)
            .map_err(|e| FingerprintError::RenderError(format!("浏览器启动失败：{:#}", e)))?;

        Ok(Self {
            slot: Arc::new(Mutex::new(Slot { generation: 0, browser })),
            headless: config.headless,
            page_timeout: config.render_timeout,
            settle_delay: config.render_settle_delay,
        })
    }

    fn render_blocking(
        slot: &Mutex<Slot<Browser>>,
        headless: bool,
        url: &Url,
        page_timeout: Duration,
        settle_delay: Duration,
    ) -> anyhow::Result<RenderTrace> {
        let tab = open_with_relaunch(slot, || launch(headless), |browser: &Browser| browser.new_tab())?;
        let result = Self::capture(&tab, url, page_timeout, settle_delay);
        if let Err(e) = tab.close(true) {
            debug!("关闭标签页失败：{}，原因：{:#}", url, e);
        }
        result
    }

    fn capture(tab: &Arc<Tab>, url: &Url, page_timeout: Duration, settle_delay: Duration) -> anyhow::Result<RenderTrace> {
        tab.set_default_timeout(page_timeout);

        let responses: Arc<Mutex<Vec<Vec<(String, String)>>>> = Arc::default();
        let console: Arc<Mutex<Vec<String>>> = Arc::default();

        let sink = responses.clone();
        tab.register_response_handling(
            RESPONSE_HANDLER_NAME,
            Box::new(move |params, _fetch_body| {
                let headers = serde_json::to_value(&params.response.headers).unwrap_or_default();
                if let Ok(mut guard) = sink.lock() {
                    guard.push(header_pairs(&headers));
                }
            }),
        )?;

        tab.enable_runtime()?;
        let sink = console.clone();
        tab.add_event_listener(Arc::new(move |event: &Event| {
            if let Event::RuntimeConsoleAPICalled(called) = event {
                let line = called
                    .params
                    .args
                    .iter()
                    .filter_map(console_arg)
                    .collect::<Vec<_>>()
                    .join(" ");
                if let Ok(mut guard) = sink.lock() {
                    guard.push(line);
                }
            }
        }))?;

        tab.navigate_to(url.as_str())?.wait_until_navigated()?;
        // 等待延迟加载的脚本执行
        std::thread::sleep(settle_delay);

        let dom = tab.get_content()?;
        let scripts = match tab.evaluate(SCRIPTS_JS, false)?.value {
            Some(Value::String(json)) => serde_json::from_str::<Vec<RenderedScript>>(&json)?,
            _ => Vec::new(),
        };

        let responses = std::mem::take(&mut *responses.lock().unwrap_or_else(|p| p.into_inner()));
        let console = std::mem::take(&mut *console.lock().unwrap_or_else(|p| p.into_inner()));
        debug!(
            "渲染完成：{}，响应{}个，脚本{}个，控制台{}行",
            url,
            responses.len(),
            scripts.len(),
            console.len()
        );

        Ok(RenderTrace {
            responses,
            dom,
            scripts,
            console,
        })
    }
}

#[async_trait]
impl RenderedContentProvider for HeadlessBrowserProvider {
    async fn render(&self, url: &Url) -> Result<RenderTrace, ChannelFailure> {
        let slot = self.slot.clone();
        let owned = url.clone();
        let (headless, page_timeout, settle_delay) = (self.headless, self.page_timeout, self.settle_delay);
        let task = tokio::task::spawn_blocking(move || {
            Self::render_blocking(&slot, headless, &owned, page_timeout, settle_delay)
        });

        let outer = page_timeout + settle_delay + OUTER_TIMEOUT_SLACK;
        match tokio::time::timeout(outer, task).await {
            Ok(Ok(Ok(trace))) => Ok(trace),
            Ok(Ok(Err(e))) => Err(ChannelFailure::rendered(format!("{:#}", e))),
            Ok(Err(e)) => Err(ChannelFailure::rendered(format!("render task failed: {}", e))),
            Err(_) => Err(ChannelFailure::rendered(format!("render timed out after {:?}", outer))),
        }
    }
}

fn launch(headless: bool) -> anyhow::Result<Browser> {
    let options = LaunchOptions::default_builder()
        .headless(headless)
        .idle_browser_timeout(BROWSER_IDLE_TIMEOUT)
        .build()
        .map_err(|e| anyhow::anyhow!("浏览器启动参数无效：{}", e))?;
    Browser::new(options)
}

// 用当前浏览器执行open，失败则重启浏览器再试一次
// 并发失败时只重启一次：发现代数已变说明别的任务已经重启过
fn open_with_relaunch<B, T>(
    slot: &Mutex<Slot<B>>,
    launch: impl FnOnce() -> anyhow::Result<B>,
    open: impl Fn(&B) -> anyhow::Result<T>,
) -> anyhow::Result<T>
where
    B: Clone,
{
    let (seen, current) = {
        let guard = slot.lock().unwrap_or_else(|p| p.into_inner());
        (guard.generation, guard.browser.clone())
    };
    let err = match open(&current) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let mut guard = slot.lock().unwrap_or_else(|p| p.into_inner());
    if guard.generation == seen {
        warn!("浏览器不可用，正在重启：{:#}", err);
        guard.browser = launch()?;
        guard.generation += 1;
    }
    let fresh = guard.browser.clone();
    drop(guard);
    open(&fresh)
}

/// CDP返回的Header对象转为键值对（名称小写）
fn header_pairs(headers: &Value) -> Vec<(String, String)> {
    let Some(map) = headers.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.to_lowercase(), value)
        })
        .collect()
}

fn console_arg(arg: &RemoteObject) -> Option<String> {
    match &arg.value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => arg.description.clone(),
    }
}
