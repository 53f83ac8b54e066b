//! 全局配置管理,存储所有可配置项

use std::time::Duration;

/// 默认浏览器标识（桌面版 Chrome 120）
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,     // 不重试
    Times(u8), // 固定次数重试（不含第一次）
}

impl RetryPolicy {
    /// 最大重试次数（0表示不重试）
    pub fn max_retries(&self) -> usize {
        match self {
            RetryPolicy::Never => 0,
            RetryPolicy::Times(n) => *n as usize,
        }
    }
}

/// 指纹识别配置
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    // 单次HTTP请求超时（主请求与探测请求共用）
    pub request_timeout: Duration,
    // 渲染页面加载超时
    pub render_timeout: Duration,
    // 页面加载完成后等待延迟脚本执行的时间
    pub render_settle_delay: Duration,
    // 同时处理的目标数上限
    pub concurrency: usize,
    // 常见路径探测列表
    pub probe_paths: Vec<String>,
    // 错误页探测路径（刻意不存在）
    pub error_probe_path: String,
    pub user_agent: String,
    pub accept_language: String,
    // 单个URL变体的重试策略
    pub retry: RetryPolicy,
    pub max_redirects: usize,
    // 是否以无头模式启动浏览器
    pub headless: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            render_timeout: Duration::from_secs(30),
            render_settle_delay: Duration::from_secs(2),
            concurrency: 10,
            probe_paths: ["/login", "/admin", "/dashboard", "/user"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            error_probe_path: "/__nonexistent__".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            retry: RetryPolicy::Never,
            max_redirects: 10,
            headless: true,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> FingerprintConfig {
        FingerprintConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: FingerprintConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout = timeout;
        self
    }

    pub fn render_settle_delay(mut self, delay: Duration) -> Self {
        self.config.render_settle_delay = delay;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn probe_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.probe_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn error_probe_path(mut self, path: impl Into<String>) -> Self {
        self.config.error_probe_path = path.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.config.accept_language = accept_language.into();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// 构建配置（并发度至少为1）
    pub fn build(mut self) -> FingerprintConfig {
        self.config.concurrency = self.config.concurrency.max(1);
        self.config
    }
}
