//! 直连抓取（通道A）
//! 主请求逐个尝试URL变体，成功后发起错误页与常见路径探测

use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::{ChannelFailure, Target};
use crate::compiler::SignalCatalog;
use crate::config::{FingerprintConfig, RetryPolicy};
use crate::detector::{Evidence, ProbeAnalyzer};
use crate::error::{FingerprintError, FpResult};
use crate::utils::HeaderConverter;

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// 主请求抓取结果
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// 跟随重定向后的最终URL
    pub url: Url,
    pub status: u16,
    /// Header键值对（名称小写）
    pub headers: Vec<(String, String)>,
    /// Set-Cookie解析结果（名称小写）
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

// 探测请求结果，仅在本通道内使用
#[derive(Debug)]
struct ProbeResult {
    path: String,
    status: u16,
    body: String,
}

/// 直连抓取器，主请求与探测请求共用同一个客户端
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: Client,
    retry: RetryPolicy,
    probe_paths: Vec<String>,
    error_probe_path: String,
}

impl DirectFetcher {
    pub fn new(config: &FingerprintConfig) -> FpResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .redirect(Policy::limited(config.max_redirects))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            retry: config.retry,
            probe_paths: config.probe_paths.clone(),
            error_probe_path: config.error_probe_path.clone(),
        })
    }

    /// 依次尝试各URL变体，首个能读到响应体的变体即为结果（不看状态码）
    pub async fn fetch(&self, target: &Target) -> Result<FetchedDocument, ChannelFailure> {
        let mut reasons = Vec::new();
        for url in target.variants() {
            match self.fetch_with_retry(url).await {
                Ok(document) => {
                    debug!("直连抓取成功：{} -> {}（状态码 {}）", url, document.url, document.status);
                    return Ok(document);
                }
                Err(e) => {
                    debug!("直连抓取失败，尝试下一个变体：{}，原因：{}", url, e);
                    reasons.push(format!("{}: {}", url, e));
                }
            }
        }

        let failure = ChannelFailure::direct(format!("all URL variants failed ({})", reasons.join("; ")));
        warn!("[{}] {}", target, failure);
        Err(failure)
    }

    /// 错误页与常见路径探测，任一探测失败只记debug日志，不影响其他结果
    pub async fn probe(&self, catalog: &SignalCatalog, base: &Url) -> Vec<Evidence> {
        let mut evidence = Vec::new();

        match self.fetch_probe(base, &self.error_probe_path).await {
            Ok(result) => {
                debug!("错误页探测完成：{}（状态码 {}）", result.path, result.status);
                evidence.extend(ProbeAnalyzer::analyze_error_page(catalog, &result.body));
            }
            Err(e) => debug!("错误页探测失败：{}{}，原因：{}", base, self.error_probe_path, e),
        }

        for path in &self.probe_paths {
            match self.fetch_probe(base, path).await {
                Ok(result) if result.status == StatusCode::OK.as_u16() => {
                    evidence.extend(ProbeAnalyzer::analyze_common_path(catalog, &result.path, &result.body));
                }
                Ok(result) => debug!("路径探测跳过：{}（状态码 {}）", result.path, result.status),
                Err(e) => debug!("路径探测失败：{}，原因：{}", path, e),
            }
        }

        evidence
    }

    // 单个变体的有限次重试
    async fn fetch_with_retry(&self, url: &Url) -> FpResult<FetchedDocument> {
        let max_retries = self.retry.max_retries();
        let mut last_err: Option<FingerprintError> = None;

        for attempt in 0..=max_retries {
            match self.fetch_once(url).await {
                Ok(document) => return Ok(document),
                Err(e) => {
                    if attempt < max_retries {
                        debug!("请求失败，重试中（{}/{}）：{}，原因：{}", attempt + 1, max_retries, url, e);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| FingerprintError::InvalidInput(format!("无可用请求：{}", url))))
    }

    async fn fetch_once(&self, url: &Url) -> FpResult<FetchedDocument> {
        let response = self.client.get(url.clone()).send().await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let headers = HeaderConverter::to_pairs(response.headers());
        let body = response.text().await?;
        let cookies = HeaderConverter::parse_set_cookies(&headers);

        Ok(FetchedDocument {
            url: final_url,
            status,
            headers,
            cookies,
            body,
        })
    }

    async fn fetch_probe(&self, base: &Url, path: &str) -> FpResult<ProbeResult> {
        let url = base.join(path)?;
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ProbeResult {
            path: path.to_string(),
            status,
            body,
        })
    }
}

fn header_value(value: &str) -> FpResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| FingerprintError::InvalidInput(format!("非法请求头取值 {:?}：{}", value, e)))
}
