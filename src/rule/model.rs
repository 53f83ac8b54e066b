//! 指纹库数据模型定义
//! 仅存储原始指纹数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 证据类别（每条指纹规则只属于一个类别）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Header,
    Cookie,
    Html,
    Script,
    Path,
    ErrorSnippet,
    MetaGenerator,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Header,
        Category::Cookie,
        Category::Html,
        Category::Script,
        Category::Path,
        Category::ErrorSnippet,
        Category::MetaGenerator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Header => "header",
            Category::Cookie => "cookie",
            Category::Html => "html",
            Category::Script => "script",
            Category::Path => "path",
            Category::ErrorSnippet => "error-snippet",
            Category::MetaGenerator => "meta-generator",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 渲染通道专用的精选规则表
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawRenderTables {
    /// DOM 属性提示（按 html 类别计入）
    #[serde(default, rename = "dom-hints")]
    pub dom_hints: Map<String, Value>,
    /// 脚本关键字 -> 框架
    #[serde(default, rename = "script-keys")]
    pub script_keys: Map<String, Value>,
    /// 统计/广告/CDN 脚本标记，命中即跳过
    #[serde(default, rename = "excluded-scripts")]
    pub excluded_scripts: Vec<String>,
}

/// 原始指纹库（JSON 格式）
/// 类别下的每一项：`"key": "框架"`（扁平）或 `"key": { "pattern": "框架" }`（门控嵌套）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawCatalog {
    #[serde(default)]
    pub header: Map<String, Value>,
    #[serde(default)]
    pub cookie: Map<String, Value>,
    #[serde(default)]
    pub html: Map<String, Value>,
    #[serde(default)]
    pub script: Map<String, Value>,
    #[serde(default)]
    pub path: Map<String, Value>,
    #[serde(default, rename = "error-snippet")]
    pub error_snippet: Map<String, Value>,
    #[serde(default, rename = "meta-generator")]
    pub meta_generator: Map<String, Value>,

    /// 内联脚本内容特征
    #[serde(default, rename = "inline-script")]
    pub inline_script: Map<String, Value>,
    /// 框架 -> 弱提示列表（弱路径佐证 + 控制台匹配）
    #[serde(default, rename = "weak-hints")]
    pub weak_hints: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub render: RawRenderTables,
}

impl RawCatalog {
    /// 按类别取原始规则表
    pub fn category(&self, category: Category) -> &Map<String, Value> {
        match category {
            Category::Header => &self.header,
            Category::Cookie => &self.cookie,
            Category::Html => &self.html,
            Category::Script => &self.script,
            Category::Path => &self.path,
            Category::ErrorSnippet => &self.error_snippet,
            Category::MetaGenerator => &self.meta_generator,
        }
    }

    /// 规则总数（用于日志统计）
    pub fn rule_count(&self) -> usize {
        Category::ALL.iter().map(|c| self.category(*c).len()).sum::<usize>()
            + self.inline_script.len()
            + self.render.dom_hints.len()
            + self.render.script_keys.len()
    }
}
