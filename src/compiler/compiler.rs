//! 指纹库编译器核心
//! 负责将原始指纹表编译为可执行的匹配规则，任何非法规则都在启动期报错

use std::collections::HashMap;
use std::time::Instant;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use tracing::debug;

use super::pattern::{FlatRule, GatedRule, Matcher, Rule, RuleSet, ScriptKey, SignalCatalog};
use crate::error::{FingerprintError, FpResult};
use crate::rule::{Category, RawCatalog};

/// 指纹库编译器
pub struct CatalogCompiler;

impl CatalogCompiler {
    /// 编译指纹库
    pub fn compile(raw: &RawCatalog) -> FpResult<SignalCatalog> {
        let start = Instant::now();
        let mut categories = HashMap::new();

        // 1. 编译七个证据类别
        for category in Category::ALL {
            let set = Self::compile_table(category.as_str(), raw.category(category), category)?;
            if !set.is_empty() {
                categories.insert(category, set);
            }
        }

        // 2. 编译内联脚本与渲染通道的精选表
        let inline_scripts = Self::compile_table("inline-script", &raw.inline_script, Category::Html)?;
        let dom_hints = Self::compile_table("render.dom-hints", &raw.render.dom_hints, Category::Html)?;
        let script_keys = Self::compile_script_keys(&raw.render.script_keys)?;

        // 3. 弱提示与排除标记统一小写
        let weak_hints = raw
            .weak_hints
            .iter()
            .map(|(framework, hints)| {
                (framework.clone(), hints.iter().map(|h| h.to_lowercase()).collect())
            })
            .collect();
        let excluded_scripts = raw.render.excluded_scripts.iter().map(|m| m.to_lowercase()).collect();

        let catalog = SignalCatalog {
            categories,
            inline_scripts,
            dom_hints,
            script_keys,
            excluded_scripts,
            weak_hints,
        };

        debug!(
            "Signal catalog compiled in {:?}: {} rules, {} weak-hint frameworks",
            start.elapsed(),
            catalog.rule_count(),
            catalog.weak_hints.len()
        );

        Ok(catalog)
    }

    /// 编译一张规则表，值为字符串即扁平规则，值为对象即门控规则
    /// `mode` 决定扁平模式的默认匹配方式
    fn compile_table(table: &str, entries: &Map<String, Value>, mode: Category) -> FpResult<RuleSet> {
        let mut rules = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            match value {
                Value::String(framework) => {
                    rules.push(Rule::Flat(FlatRule {
                        matcher: Self::compile_key(key, mode)?,
                        framework: framework.clone(),
                    }));
                }
                Value::Object(nested) => {
                    let mut nested_rules = Vec::with_capacity(nested.len());
                    for (pattern, framework) in nested {
                        let Value::String(framework) = framework else {
                            return Err(FingerprintError::CatalogConfig(format!(
                                "{}.{}.{} 的框架名必须是字符串",
                                table, key, pattern
                            )));
                        };
                        nested_rules.push(FlatRule {
                            matcher: match mode {
                                Category::Path => Matcher::Contains(pattern.to_lowercase()),
                                _ => Self::compile_pattern(pattern, false)?,
                            },
                            framework: framework.clone(),
                        });
                    }
                    rules.push(Rule::Gated(GatedRule {
                        key: Self::compile_key(key, mode)?,
                        rules: nested_rules,
                    }));
                }
                _ => {
                    return Err(FingerprintError::CatalogConfig(format!(
                        "{}.{} 规则类型不支持（仅支持字符串或对象）",
                        table, key
                    )));
                }
            }
        }

        Ok(RuleSet::new(rules))
    }

    /// 规则键：Header 名称全等匹配，script 类别默认正则，其余默认包含匹配
    /// path 类别一律按字面包含匹配，`/packs/` 这类路径首尾本就带斜杠
    fn compile_key(key: &str, mode: Category) -> FpResult<Matcher> {
        match mode {
            Category::Header if !is_delimited_regex(key) => Ok(Matcher::Exact(key.to_lowercase())),
            Category::Path if key.is_empty() => {
                Err(FingerprintError::CatalogConfig("空模式不允许出现在指纹库中".to_string()))
            }
            Category::Path => Ok(Matcher::Contains(key.to_lowercase())),
            Category::Script => Self::compile_pattern(key, true),
            _ => Self::compile_pattern(key, false),
        }
    }

    /// 编译单个模式：`/.../` 包裹或强制正则时按正则编译，否则按小写包含匹配
    fn compile_pattern(raw_pattern: &str, force_regex: bool) -> FpResult<Matcher> {
        if raw_pattern.is_empty() {
            return Err(FingerprintError::CatalogConfig("空模式不允许出现在指纹库中".to_string()));
        }

        if is_delimited_regex(raw_pattern) {
            return Ok(Matcher::Regex(build_regex(&raw_pattern[1..raw_pattern.len() - 1])?));
        }
        if force_regex {
            return Ok(Matcher::Regex(build_regex(raw_pattern)?));
        }

        Ok(Matcher::Contains(raw_pattern.to_lowercase()))
    }

    /// 编译渲染通道脚本关键字：外链按 `\bkey[./-]`，内联按 `\bkey[(\s]`
    fn compile_script_keys(entries: &Map<String, Value>) -> FpResult<Vec<ScriptKey>> {
        let mut keys = Vec::with_capacity(entries.len());
        for (key, framework) in entries {
            let Value::String(framework) = framework else {
                return Err(FingerprintError::CatalogConfig(format!(
                    "render.script-keys.{} 的框架名必须是字符串",
                    key
                )));
            };
            let escaped = regex::escape(&key.to_lowercase());
            keys.push(ScriptKey {
                key: key.to_lowercase(),
                framework: framework.clone(),
                src_regex: build_regex(&format!(r"\b{}[./-]", escaped))?,
                text_regex: build_regex(&format!(r"\b{}[(\s]", escaped))?,
            });
        }
        Ok(keys)
    }
}

fn is_delimited_regex(pattern: &str) -> bool {
    pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/')
}

fn build_regex(pattern: &str) -> FpResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| FingerprintError::CatalogConfig(format!("非法正则 `{}`：{}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::pattern::Signal;

    fn compile(json: &str) -> FpResult<SignalCatalog> {
        let raw: RawCatalog = serde_json::from_str(json).unwrap();
        CatalogCompiler::compile(&raw)
    }

    #[test]
    fn test_header_keys_are_exact_and_gated() {
        let catalog = compile(
            r#"{"header": {"x-runtime": "Ruby on Rails", "x-powered-by": {"laravel": "Laravel"}}}"#,
        )
        .unwrap();

        let hits = catalog.matches(Category::Header, &Signal::Field { name: "x-runtime", value: "0.01" });
        assert_eq!(hits[0].framework, "Ruby on Rails");

        let hits = catalog.matches(Category::Header, &Signal::Field { name: "x-runtime-ms", value: "1" });
        assert!(hits.is_empty());

        let hits = catalog.matches(Category::Header, &Signal::Field { name: "X-Powered-By", value: "LARAVEL" });
        assert_eq!(hits[0].framework, "Laravel");
    }

    #[test]
    fn test_script_category_is_regex() {
        let catalog = compile(r#"{"script": {"vue(\\.min)?(\\.\\d+)?\\.js$": "Vue.js"}}"#).unwrap();
        let hits = catalog.matches(Category::Script, &Signal::Text("/static/vue.min.js"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fragment, "vue.min.js");
        assert!(catalog.matches(Category::Script, &Signal::Text("/static/vue.min.js.map")).is_empty());
    }

    #[test]
    fn test_delimited_regex_in_flat_category() {
        let catalog = compile(r#"{"html": {"/data-v-[0-9a-f]{8}/": "Vue.js"}}"#).unwrap();
        let hits = catalog.matches(Category::Html, &Signal::Text(r#"<div data-v-7ba5bd90>"#));
        assert_eq!(hits[0].framework, "Vue.js");
    }

    #[test]
    fn test_path_keys_are_literal() {
        let catalog = compile(r#"{"path": {"/build/": "Next.js/Nuxt.js", "/packs/": "Ruby on Rails"}}"#).unwrap();
        assert!(catalog.matches(Category::Path, &Signal::Text("<p>We build websites</p>")).is_empty());

        let hits = catalog.matches(Category::Path, &Signal::Text(r#"<link href="/packs/app.css">"#));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pattern, "/packs/");
        assert_eq!(hits[0].fragment, "/packs/");
    }

    #[test]
    fn test_malformed_regex_is_config_error() {
        let err = compile(r#"{"script": {"react(\\.min.js": "React"}}"#).unwrap_err();
        assert!(matches!(err, FingerprintError::CatalogConfig(_)));
    }

    #[test]
    fn test_wrong_value_shape_is_config_error() {
        let err = compile(r#"{"cookie": {"csrftoken": 1}}"#).unwrap_err();
        assert!(matches!(err, FingerprintError::CatalogConfig(_)));
    }

    #[test]
    fn test_script_keys_compiled() {
        let catalog = compile(r#"{"render": {"script-keys": {"react": "React"}}}"#).unwrap();
        let key = &catalog.script_keys()[0];
        assert!(key.src_regex.is_match("/assets/react.production.min.js"));
        assert!(!key.src_regex.is_match("/assets/preact.js"));
        assert!(key.text_regex.is_match("react(document.body)"));
    }
}
