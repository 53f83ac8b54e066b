//! 调度器：有界并发地对每个目标执行 通道A -> 探测 -> 通道B -> 收集 -> 裁决

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::{ChannelFailure, DirectFetcher, RenderedContentProvider, Target};
use crate::compiler::SignalCatalog;
use crate::config::FingerprintConfig;
use crate::detector::{
    init_global_catalog, ConfidenceResolver, DocumentAnalyzer, EvidenceCollector, RenderAnalyzer, Verdict,
};
use crate::error::{FingerprintError, FpResult};
use crate::report::{TargetFailure, TargetReport};

/// 单个目标的处理结果
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: String,
    pub verdict: Result<Verdict, TargetFailure>,
    /// 已恢复的通道失败记录
    pub notes: Vec<ChannelFailure>,
}

impl TargetOutcome {
    fn failed(target: &str, reason: impl Into<String>, notes: Vec<ChannelFailure>) -> Self {
        Self {
            target: target.to_string(),
            verdict: Err(TargetFailure::new(target, reason)),
            notes,
        }
    }

    pub fn report(&self) -> TargetReport {
        match &self.verdict {
            Ok(verdict) => TargetReport::from_verdict(&self.target, verdict),
            Err(_) => TargetReport::fetch_error(&self.target),
        }
    }

    pub fn failure(&self) -> Option<&TargetFailure> {
        self.verdict.as_ref().err()
    }
}

/// 一批目标的处理结果，顺序与输入一致
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub outcomes: Vec<TargetOutcome>,
}

impl BatchOutcome {
    /// 每个目标一行汇总（失败目标为fetch error）
    pub fn reports(&self) -> Vec<TargetReport> {
        self.outcomes.iter().map(TargetOutcome::report).collect()
    }

    pub fn failures(&self) -> Vec<TargetFailure> {
        self.outcomes.iter().filter_map(|o| o.failure().cloned()).collect()
    }
}

// 单目标处理流水线，目标内部顺序执行
struct Pipeline {
    catalog: Arc<SignalCatalog>,
    fetcher: DirectFetcher,
    renderer: Arc<dyn RenderedContentProvider>,
}

impl Pipeline {
    async fn run(&self, raw: &str) -> TargetOutcome {
        let target = match Target::parse(raw) {
            Ok(target) => target,
            Err(e) => {
                warn!("[{}] 目标非法：{}", raw, e);
                return TargetOutcome::failed(raw.trim(), e.to_string(), Vec::new());
            }
        };

        let collector = EvidenceCollector::new();
        let mut notes = Vec::new();

        // 1. 通道A与探测
        let resolved = match self.fetcher.fetch(&target).await {
            Ok(document) => {
                collector.extend(DocumentAnalyzer::analyze(&self.catalog, &document));
                collector.extend(self.fetcher.probe(&self.catalog, &document.url).await);
                Some(document.url)
            }
            Err(failure) => {
                notes.push(failure);
                None
            }
        };

        // 2. 通道B：优先用通道A解析出的URL，否则逐个尝试变体
        let candidates: Vec<Url> = match &resolved {
            Some(url) => vec![url.clone()],
            None => target.variants().to_vec(),
        };
        let mut rendered = false;
        for url in &candidates {
            match self.renderer.render(url).await {
                Ok(trace) => {
                    collector.extend(RenderAnalyzer::analyze(&self.catalog, &trace));
                    rendered = true;
                    break;
                }
                Err(failure) => {
                    warn!("[{}] 渲染失败：{}", target, failure);
                    notes.push(failure);
                }
            }
        }

        if resolved.is_none() && !rendered {
            let reason = notes.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            return TargetOutcome::failed(target.raw(), reason, notes);
        }

        // 3. 裁决
        debug!("[{}] 证据共{}条", target, collector.len());
        let verdict = ConfidenceResolver::resolve(&collector.snapshot());
        info!(
            "[{}] 识别完成：{:?}（等级 {}）",
            target,
            verdict.framework_names(),
            verdict.tier.map(|t| t.to_string()).unwrap_or_else(|| "none".to_string())
        );

        TargetOutcome {
            target: target.raw().to_string(),
            verdict: Ok(verdict),
            notes,
        }
    }
}

/// 批量指纹识别调度器
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(
        config: &FingerprintConfig,
        catalog: Arc<SignalCatalog>,
        renderer: Arc<dyn RenderedContentProvider>,
    ) -> FpResult<Self> {
        let fetcher = DirectFetcher::new(config)?;
        Ok(Self {
            pipeline: Arc::new(Pipeline {
                catalog,
                fetcher,
                renderer,
            }),
            concurrency: config.concurrency.max(1),
        })
    }

    /// 使用全局指纹库（首次调用时加载内置规则）
    pub async fn with_global_catalog(
        config: &FingerprintConfig,
        renderer: Arc<dyn RenderedContentProvider>,
    ) -> FpResult<Self> {
        let catalog = init_global_catalog().await?;
        Self::new(config, catalog, renderer)
    }

    /// 处理单个目标
    pub async fn fingerprint(&self, target: &str) -> TargetOutcome {
        self.pipeline.run(target).await
    }

    /// 并发处理一批目标，同时在途的目标数不超过concurrency
    pub async fn run<I, S>(&self, targets: I) -> BatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::new();

        for target in targets {
            let target: String = target.into();
            let pipeline = self.pipeline.clone();
            let semaphore = semaphore.clone();
            let handle = tokio::spawn({
                let target = target.clone();
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| FingerprintError::AsyncTaskError(e.to_string()))?;
                    Ok::<_, FingerprintError>(pipeline.run(&target).await)
                }
            });
            handles.push((target, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => TargetOutcome::failed(&target, e.to_string(), Vec::new()),
                Err(e) => {
                    let e = FingerprintError::AsyncTaskError(e.to_string());
                    warn!("[{}] {}", target, e);
                    TargetOutcome::failed(&target, e.to_string(), Vec::new())
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| o.verdict.is_err()).count();
        info!("批量识别完成：目标{}个，失败{}个", outcomes.len(), failed);
        BatchOutcome { outcomes }
    }
}
