//! rsfwprobe - 多通道 Web 框架指纹识别引擎

// 导出全局错误类型
pub use self::error::{FingerprintError, FpResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, FingerprintConfig, RetryPolicy};

// 导出规则模块核心接口
pub use self::rule::{Category, CatalogLoader, CatalogSource, RawCatalog};

// 导出编译模块核心接口
pub use self::compiler::{CatalogCompiler, Matcher, Rule, Signal, SignalCatalog, SignalHit};

// 导出提取模块核心接口
pub use self::extractor::HtmlExtractor;

// 导出工具模块核心接口
pub use self::utils::{HeaderConverter, SnippetExtractor};

// 导出通道模块核心接口
pub use self::channel::{
    default_renderer, ChannelFailure, DirectFetcher, DisabledRenderer, FetchedDocument, RenderTrace,
    RenderedContentProvider, RenderedScript, ReplayRenderer, Target,
};
#[cfg(feature = "browser")]
pub use self::channel::HeadlessBrowserProvider;

// 导出检测模块核心接口
pub use self::detector::{
    global_catalog, init_global_catalog, init_global_catalog_with, Channel, ConfidenceResolver, Evidence,
    EvidenceCollector, FrameworkVerdict, Tier, Verdict,
};

// 导出调度与输出
pub use self::orchestrator::{BatchOutcome, Orchestrator, TargetOutcome};
pub use self::report::{TargetFailure, TargetReport, TargetStatus};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod extractor;
pub mod utils;
pub mod compiler;
pub mod channel;
pub mod detector;
pub mod orchestrator;
pub mod report;
