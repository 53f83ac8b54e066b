//! 结果输出：每个目标一行汇总，另附失败记录

use std::fmt;
use serde::Serialize;

use crate::detector::Verdict;

/// 目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetStatus {
    #[serde(rename = "detected")]
    Detected,
    #[serde(rename = "not detected")]
    NotDetected,
    #[serde(rename = "fetch error")]
    FetchError,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Detected => f.write_str("detected"),
            TargetStatus::NotDetected => f.write_str("not detected"),
            TargetStatus::FetchError => f.write_str("fetch error"),
        }
    }
}

/// 单个目标的汇总行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub target: String,
    /// 框架名，`;` 连接
    pub frameworks: String,
    /// 每个框架一段 `<等级>:<来源标签;...>`，段之间 `;` 连接
    pub sources: String,
    pub status: TargetStatus,
}

impl TargetReport {
    pub fn from_verdict(target: impl Into<String>, verdict: &Verdict) -> Self {
        let frameworks = verdict.framework_names().join(";");
        let sources = verdict
            .frameworks
            .values()
            .map(|fv| fv.joined_sources())
            .collect::<Vec<_>>()
            .join(";");
        let status = if verdict.is_detected() {
            TargetStatus::Detected
        } else {
            TargetStatus::NotDetected
        };

        Self {
            target: target.into(),
            frameworks,
            sources,
            status,
        }
    }

    pub fn fetch_error(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            frameworks: String::new(),
            sources: String::new(),
            status: TargetStatus::FetchError,
        }
    }
}

/// 目标失败记录（两个通道都失败、目标非法或任务异常）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFailure {
    pub target: String,
    pub reason: String,
}

impl TargetFailure {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{Channel, ConfidenceResolver, Evidence, EvidenceCollector};
    use crate::rule::Category;

    #[test]
    fn test_report_strings() {
        let collector = EvidenceCollector::new();
        collector.add(Evidence::new("Laravel", Category::Header, Channel::Direct, "laravel", "header:x-powered-by,line:laravel"));
        collector.add(Evidence::new("Laravel", Category::Cookie, Channel::Direct, "abc", "cookie:laravel_session,line:laravel_session=abc"));
        collector.add(Evidence::new("React", Category::Html, Channel::Rendered, "data-reactroot", "render:dom,line:<div data-reactroot>"));
        let verdict = ConfidenceResolver::resolve(&collector.snapshot());

        let report = TargetReport::from_verdict("example.com", &verdict);
        assert_eq!(report.frameworks, "Laravel;React");
        assert_eq!(
            report.sources,
            "high:header:x-powered-by,line:laravel;cookie:laravel_session,line:laravel_session=abc;high:render:dom,line:<div data-reactroot>"
        );
        assert_eq!(report.status, TargetStatus::Detected);
    }

    #[test]
    fn test_status_serialization() {
        let report = TargetReport::from_verdict("a.test", &Verdict::default());
        assert_eq!(report.status.to_string(), "not detected");

        let json = serde_json::to_value(TargetReport::fetch_error("b.test")).unwrap();
        assert_eq!(json["status"], "fetch error");
        assert_eq!(json["frameworks"], "");
    }
}
