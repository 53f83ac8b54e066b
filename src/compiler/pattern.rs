//! 编译后模式模型
//! 指纹规则编译后的结构与统一匹配入口

use std::collections::{BTreeMap, HashMap};
use regex::Regex;

use crate::rule::Category;

#[derive(Debug, Clone)]
pub enum Matcher {
    Contains(String), // 包含匹配（模式已小写）
    Exact(String),    // 全等匹配（Header 名称）
    Regex(Regex),     // 正则匹配（忽略大小写编译）
}

impl Matcher {
    /// 简单匹配判断，输入须已小写
    pub fn is_match(&self, input: &str) -> bool {
        self.find(input).is_some()
    }

    /// 返回命中的原始片段
    pub fn find<'a>(&self, input: &'a str) -> Option<&'a str> {
        match self {
            Matcher::Contains(s) => input.find(s.as_str()).map(|pos| &input[pos..pos + s.len()]),
            Matcher::Exact(s) => (input == s.as_str()).then_some(input),
            Matcher::Regex(regex) => regex.find(input).map(|m| m.as_str()),
        }
    }

    /// 规则描述（模式原文）
    pub fn describe(&self) -> &str {
        match self {
            Matcher::Contains(s) | Matcher::Exact(s) => s,
            Matcher::Regex(r) => r.as_str(),
        }
    }
}

/// 扁平规则：模式 -> 框架
#[derive(Debug, Clone)]
pub struct FlatRule {
    pub matcher: Matcher,
    pub framework: String,
}

/// 门控规则：门控键命中后，在该键对应的值上查找嵌套模式，首个命中生效
#[derive(Debug, Clone)]
pub struct GatedRule {
    pub key: Matcher,
    pub rules: Vec<FlatRule>,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Flat(FlatRule),
    Gated(GatedRule),
}

/// 待匹配的内容
#[derive(Debug, Clone, Copy)]
pub enum Signal<'a> {
    /// 整段文本（HTML、脚本地址、错误页、generator 等）
    Text(&'a str),
    /// 单个键值对（Header / Cookie）
    Field { name: &'a str, value: &'a str },
}

/// 一次规则命中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalHit {
    pub framework: String,
    pub category: Category,
    /// 命中的规则模式
    pub pattern: String,
    /// 门控键（门控规则或键值对扁平规则）
    pub key: Option<String>,
    /// 实际命中的内容片段
    pub fragment: String,
    /// 是否来自门控规则
    pub gated: bool,
}

/// 同一类别下的规则集合，门控规则始终排在扁平规则之前
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut set = Self { rules };
        set.normalize();
        set
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
        self.normalize();
    }

    // 稳定排序：门控在前，各自保留原顺序
    fn normalize(&mut self) {
        self.rules.sort_by_key(|rule| matches!(rule, Rule::Flat(_)));
    }

    /// 穷举匹配：每条规则都参与测试，仅门控规则内部首个命中即停
    /// 同一字段上门控规则已命中的键，不再让同名扁平规则重复计入
    pub fn matches(&self, category: Category, signal: &Signal<'_>) -> Vec<SignalHit> {
        let mut hits = Vec::new();
        let mut gated_keys: Vec<&str> = Vec::new();

        match *signal {
            Signal::Text(text) => {
                let lowered = text.to_lowercase();
                for rule in &self.rules {
                    match rule {
                        Rule::Gated(gated) => {
                            if !gated.key.is_match(&lowered) {
                                continue;
                            }
                            if let Some(hit) = first_nested_hit(category, gated, &lowered, None) {
                                gated_keys.push(gated.key.describe());
                                hits.push(hit);
                            }
                        }
                        Rule::Flat(flat) => {
                            if gated_keys.contains(&flat.matcher.describe()) {
                                continue;
                            }
                            if let Some(fragment) = flat.matcher.find(&lowered) {
                                hits.push(SignalHit {
                                    framework: flat.framework.clone(),
                                    category,
                                    pattern: flat.matcher.describe().to_string(),
                                    key: None,
                                    fragment: fragment.to_string(),
                                    gated: false,
                                });
                            }
                        }
                    }
                }
            }
            Signal::Field { name, value } => {
                let name = name.to_lowercase();
                let value = value.to_lowercase();
                for rule in &self.rules {
                    match rule {
                        Rule::Gated(gated) => {
                            if !gated.key.is_match(&name) {
                                continue;
                            }
                            if let Some(hit) = first_nested_hit(category, gated, &value, Some(&name)) {
                                gated_keys.push(gated.key.describe());
                                hits.push(hit);
                            }
                        }
                        Rule::Flat(flat) => {
                            if gated_keys.contains(&flat.matcher.describe()) {
                                continue;
                            }
                            if flat.matcher.is_match(&name) {
                                hits.push(SignalHit {
                                    framework: flat.framework.clone(),
                                    category,
                                    pattern: flat.matcher.describe().to_string(),
                                    key: Some(name.clone()),
                                    fragment: value.clone(),
                                    gated: false,
                                });
                            }
                        }
                    }
                }
            }
        }

        hits
    }
}

fn first_nested_hit(
    category: Category,
    gated: &GatedRule,
    content: &str,
    key: Option<&str>,
) -> Option<SignalHit> {
    gated.rules.iter().find_map(|nested| {
        nested.matcher.find(content).map(|fragment| SignalHit {
            framework: nested.framework.clone(),
            category,
            pattern: nested.matcher.describe().to_string(),
            key: Some(key.unwrap_or(gated.key.describe()).to_string()),
            fragment: match key {
                Some(_) => content.to_string(),
                None => fragment.to_string(),
            },
            gated: true,
        })
    })
}

/// 渲染通道脚本关键字（外链与内联分别编译）
#[derive(Debug, Clone)]
pub struct ScriptKey {
    pub key: String,
    pub framework: String,
    pub src_regex: Regex,
    pub text_regex: Regex,
}

/// 编译后的指纹库：进程内只读共享
#[derive(Debug, Clone, Default)]
pub struct SignalCatalog {
    pub(crate) categories: HashMap<Category, RuleSet>,
    pub(crate) inline_scripts: RuleSet,
    pub(crate) dom_hints: RuleSet,
    pub(crate) script_keys: Vec<ScriptKey>,
    pub(crate) excluded_scripts: Vec<String>,
    pub(crate) weak_hints: BTreeMap<String, Vec<String>>,
}

impl SignalCatalog {
    /// 按类别匹配
    pub fn matches(&self, category: Category, signal: &Signal<'_>) -> Vec<SignalHit> {
        self.categories
            .get(&category)
            .map(|set| set.matches(category, signal))
            .unwrap_or_default()
    }

    /// 内联脚本内容匹配（计入 script 类别）
    pub fn match_inline_script(&self, text: &str) -> Vec<SignalHit> {
        self.inline_scripts.matches(Category::Script, &Signal::Text(text))
    }

    /// 渲染后 DOM 提示匹配（计入 html 类别）
    pub fn match_dom_hints(&self, dom: &str) -> Vec<SignalHit> {
        self.dom_hints.matches(Category::Html, &Signal::Text(dom))
    }

    pub fn script_keys(&self) -> &[ScriptKey] {
        &self.script_keys
    }

    /// 统计/广告/CDN 脚本、data URI 与 base64 内容一律跳过，输入须已小写
    pub fn is_excluded_script(&self, src: &str) -> bool {
        src.starts_with("data:")
            || src.contains("base64")
            || self.excluded_scripts.iter().any(|marker| src.contains(marker.as_str()))
    }

    pub fn weak_hints(&self) -> &BTreeMap<String, Vec<String>> {
        &self.weak_hints
    }

    pub fn weak_hints_for(&self, framework: &str) -> &[String] {
        self.weak_hints.get(framework).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 规则总数
    pub fn rule_count(&self) -> usize {
        self.categories.values().map(RuleSet::len).sum::<usize>()
            + self.inline_scripts.len()
            + self.dom_hints.len()
            + self.script_keys.len()
    }

    /// 追加另一份指纹库（后加载的规则排在同类已有规则之后）
    pub fn extend(&mut self, other: SignalCatalog) {
        for (category, set) in other.categories {
            self.categories.entry(category).or_default().extend(set);
        }
        self.inline_scripts.extend(other.inline_scripts);
        self.dom_hints.extend(other.dom_hints);
        self.script_keys.extend(other.script_keys);
        self.excluded_scripts.extend(other.excluded_scripts);
        for (framework, hints) in other.weak_hints {
            self.weak_hints.entry(framework).or_default().extend(hints);
        }
    }
}
