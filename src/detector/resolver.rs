//! 置信度裁决器
//! 按框架求最高证据等级，再按全局最高等级类别筛选最终结论

use std::collections::BTreeMap;
use serde::Serialize;
use tracing::debug;

use super::collector::EvidenceSnapshot;
use super::evidence::{Evidence, Tier};

/// 单个框架的结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkVerdict {
    pub framework: String,
    pub tier: Tier,
    pub evidence: Vec<Evidence>,
}

impl FrameworkVerdict {
    /// 证据来源标签（`;` 连接，带等级前缀）
    pub fn joined_sources(&self) -> String {
        let sources: Vec<&str> = self.evidence.iter().map(Evidence::source).collect();
        format!("{}:{}", self.tier.label(), sources.join(";"))
    }
}

/// 单个目标的最终结论
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// 胜出的等级，无证据时为None
    pub tier: Option<Tier>,
    pub frameworks: BTreeMap<String, FrameworkVerdict>,
}

impl Verdict {
    pub fn is_detected(&self) -> bool {
        !self.frameworks.is_empty()
    }

    pub fn framework_names(&self) -> Vec<&str> {
        self.frameworks.keys().map(String::as_str).collect()
    }
}

/// 置信度裁决器（纯函数）
pub struct ConfidenceResolver;

impl ConfidenceResolver {
    pub fn resolve(snapshot: &EvidenceSnapshot) -> Verdict {
        // 1. 每个框架取其证据的最高等级
        let mut per_framework: BTreeMap<String, FrameworkVerdict> = BTreeMap::new();
        for (framework, evidence) in snapshot {
            let Some(tier) = evidence.iter().map(Evidence::tier).max() else {
                continue;
            };
            per_framework.insert(
                framework.clone(),
                FrameworkVerdict {
                    framework: framework.clone(),
                    tier,
                    evidence: evidence.clone(),
                },
            );
        }

        // 2. 全局最高等级胜出，低等级框架整体压制
        let Some(winning) = per_framework.values().map(|v| v.tier).max() else {
            return Verdict::default();
        };

        let (kept, suppressed): (BTreeMap<_, _>, BTreeMap<_, _>) =
            per_framework.into_iter().partition(|(_, v)| v.tier == winning);

        for (framework, verdict) in &suppressed {
            debug!(
                "Suppressed {} ({} tier, {} evidence) below winning tier {}",
                framework,
                verdict.tier,
                verdict.evidence.len(),
                winning
            );
        }

        Verdict {
            tier: Some(winning),
            frameworks: kept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::collector::EvidenceCollector;
    use crate::detector::evidence::Channel;
    use crate::rule::Category;

    fn add(collector: &EvidenceCollector, framework: &str, category: Category, channel: Channel) {
        collector.add(Evidence::new(framework, category, channel, "frag", format!("{}:{}", category, framework)));
    }

    #[test]
    fn test_empty_snapshot() {
        let verdict = ConfidenceResolver::resolve(&EvidenceSnapshot::new());
        assert_eq!(verdict.tier, None);
        assert!(!verdict.is_detected());
    }

    #[test]
    fn test_strong_suppresses_weak() {
        let collector = EvidenceCollector::new();
        add(&collector, "Django", Category::Header, Channel::Direct);
        add(&collector, "Next.js", Category::Path, Channel::Direct);

        let verdict = ConfidenceResolver::resolve(&collector.snapshot());
        assert_eq!(verdict.tier, Some(Tier::Strong));
        assert_eq!(verdict.framework_names(), vec!["Django"]);
    }

    #[test]
    fn test_medium_only() {
        let collector = EvidenceCollector::new();
        add(&collector, "AngularJS", Category::Html, Channel::Direct);
        add(&collector, "Ruby on Rails", Category::Path, Channel::Direct);

        let verdict = ConfidenceResolver::resolve(&collector.snapshot());
        assert_eq!(verdict.tier, Some(Tier::Medium));
        assert_eq!(verdict.framework_names(), vec!["AngularJS"]);
    }

    #[test]
    fn test_weak_only() {
        let collector = EvidenceCollector::new();
        add(&collector, "Ruby on Rails", Category::Path, Channel::Direct);
        let verdict = ConfidenceResolver::resolve(&collector.snapshot());
        assert_eq!(verdict.tier, Some(Tier::Weak));
        assert_eq!(verdict.framework_names(), vec!["Ruby on Rails"]);
    }

    #[test]
    fn test_lower_evidence_retained_in_framework() {
        let collector = EvidenceCollector::new();
        add(&collector, "Laravel", Category::Path, Channel::Direct);
        add(&collector, "Laravel", Category::Cookie, Channel::Direct);
        add(&collector, "React", Category::Html, Channel::Rendered);

        let verdict = ConfidenceResolver::resolve(&collector.snapshot());
        assert_eq!(verdict.framework_names(), vec!["Laravel", "React"]);
        let laravel = &verdict.frameworks["Laravel"];
        assert_eq!(laravel.tier, Tier::Strong);
        assert_eq!(laravel.evidence.len(), 2);
        assert_eq!(laravel.joined_sources(), "high:path:Laravel;cookie:Laravel");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let collector = EvidenceCollector::new();
        add(&collector, "Vue.js", Category::Script, Channel::Direct);
        add(&collector, "AngularJS", Category::Html, Channel::Direct);
        let snapshot = collector.snapshot();
        assert_eq!(ConfidenceResolver::resolve(&snapshot), ConfidenceResolver::resolve(&snapshot));
    }
}
