//! 证据模型：证据、来源通道与置信等级

use std::fmt;
use serde::Serialize;

use crate::compiler::SignalHit;
use crate::rule::Category;

/// 证据来源通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Direct,   // 直连抓取（含探测请求）
    Rendered, // 无头浏览器渲染
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Direct => f.write_str("direct"),
            Channel::Rendered => f.write_str("rendered"),
        }
    }
}

/// 置信等级，声明顺序即强弱顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Weak,
    Medium,
    Strong,
}

impl Tier {
    /// 报表中使用的等级前缀
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Strong => "high",
            Tier::Medium => "medium",
            Tier::Weak => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Strong => f.write_str("strong"),
            Tier::Medium => f.write_str("medium"),
            Tier::Weak => f.write_str("weak"),
        }
    }
}

/// 一条证据，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    framework: String,
    category: Category,
    channel: Channel,
    fragment: String,
    source: String,
}

impl Evidence {
    pub fn new(
        framework: impl Into<String>,
        category: Category,
        channel: Channel,
        fragment: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            framework: framework.into(),
            category,
            channel,
            fragment: fragment.into(),
            source: source.into(),
        }
    }

    /// 由规则命中构造证据
    pub fn from_hit(hit: SignalHit, channel: Channel, source: impl Into<String>) -> Self {
        Self {
            framework: hit.framework,
            category: hit.category,
            channel,
            fragment: hit.fragment,
            source: source.into(),
        }
    }

    pub fn framework(&self) -> &str {
        &self.framework
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 渲染通道的证据一律为强证据，其余按类别分级
    pub fn tier(&self) -> Tier {
        if self.channel == Channel::Rendered {
            return Tier::Strong;
        }
        match self.category {
            Category::Header | Category::Cookie | Category::ErrorSnippet => Tier::Strong,
            Category::Html | Category::Script | Category::MetaGenerator => Tier::Medium,
            Category::Path => Tier::Weak,
        }
    }
}
