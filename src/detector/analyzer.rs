//! 检测分析器：把抓取/渲染得到的原始内容交给指纹库匹配，产出带来源标签的证据
use tracing::debug;

use super::evidence::{Channel, Evidence};
use crate::channel::{FetchedDocument, RenderTrace};
use crate::compiler::{Signal, SignalCatalog, SignalHit};
use crate::extractor::HtmlExtractor;
use crate::rule::Category;
use crate::utils::{SnippetExtractor, SHORT_SNIPPET_MAX_LEN, SNIPPET_MAX_LEN};

// 渲染通道的来源标签统一加前缀
fn tag(channel: Channel, body: String) -> String {
    match channel {
        Channel::Direct => body,
        Channel::Rendered => format!("render:{}", body),
    }
}

fn record(out: &mut Vec<Evidence>, hit: SignalHit, channel: Channel, source: String) {
    debug!("匹配成功：框架={}，类别={}，来源={}", hit.framework, hit.category, source);
    out.push(Evidence::from_hit(hit, channel, source));
}

/// Header分析器
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    /// 门控命中带上取值，扁平命中只记Header名
    pub fn analyze(catalog: &SignalCatalog, headers: &[(String, String)], channel: Channel, out: &mut Vec<Evidence>) {
        for (name, value) in headers {
            for hit in catalog.matches(Category::Header, &Signal::Field { name, value }) {
                let key = hit.key.clone().unwrap_or_else(|| name.to_lowercase());
                let source = if hit.gated {
                    format!("header:{},line:{}", key, hit.fragment)
                } else {
                    format!("header:{}", key)
                };
                record(out, hit, channel, tag(channel, source));
            }
        }
    }
}

/// Cookie分析器
pub struct CookieAnalyzer;

impl CookieAnalyzer {
    pub fn analyze(catalog: &SignalCatalog, cookies: &[(String, String)], out: &mut Vec<Evidence>) {
        for (name, value) in cookies {
            for hit in catalog.matches(Category::Cookie, &Signal::Field { name, value }) {
                let source = format!("cookie:{},line:{}={}", hit.pattern, name, value);
                record(out, hit, Channel::Direct, source);
            }
        }
    }
}

/// Meta generator分析器
pub struct MetaAnalyzer;

impl MetaAnalyzer {
    pub fn analyze(catalog: &SignalCatalog, generators: &[String], out: &mut Vec<Evidence>) {
        for content in generators {
            for hit in catalog.matches(Category::MetaGenerator, &Signal::Text(content)) {
                let source = format!("meta:generator,line:{}", content.to_lowercase());
                record(out, hit, Channel::Direct, source);
            }
        }
    }
}

/// HTML分析器
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    /// probe_path为Some时表示探测页面，来源标签带上路径
    pub fn analyze(catalog: &SignalCatalog, html: &str, probe_path: Option<&str>, out: &mut Vec<Evidence>) {
        for hit in catalog.matches(Category::Html, &Signal::Text(html)) {
            let line = SnippetExtractor::line_or_fragment(&hit.fragment, html, SNIPPET_MAX_LEN);
            let source = match probe_path {
                Some(path) => format!("html:{},path:{},line:{}", hit.pattern, path, line),
                None => format!("html:{},line:{}", hit.pattern, line),
            };
            record(out, hit, Channel::Direct, source);
        }
    }
}

/// Script分析器
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    /// 外链地址匹配script规则
    pub fn analyze_srcs(catalog: &SignalCatalog, script_srcs: &[String], out: &mut Vec<Evidence>) {
        for src in script_srcs {
            let lowered = src.to_lowercase();
            for hit in catalog.matches(Category::Script, &Signal::Text(&lowered)) {
                let source = format!("script:{},line:{}", hit.pattern, lowered);
                record(out, hit, Channel::Direct, source);
            }
        }
    }

    /// 内联脚本只取首个命中
    pub fn analyze_inline(catalog: &SignalCatalog, inline_scripts: &[String], out: &mut Vec<Evidence>) {
        for text in inline_scripts {
            if let Some(hit) = catalog.match_inline_script(text).into_iter().next() {
                let source = format!(
                    "script:inline,line:{}",
                    SnippetExtractor::truncate(text.trim(), SHORT_SNIPPET_MAX_LEN)
                );
                record(out, hit, Channel::Direct, source);
            }
        }
    }
}

/// 路径分析器
pub struct PathAnalyzer;

impl PathAnalyzer {
    /// 资源引用（script/link/img的src与href）中的路径
    pub fn analyze_refs(catalog: &SignalCatalog, asset_refs: &[String], out: &mut Vec<Evidence>) {
        for value in asset_refs {
            for hit in catalog.matches(Category::Path, &Signal::Text(value)) {
                let source = format!("path:{},line:{}", hit.pattern, value);
                record(out, hit, Channel::Direct, source);
            }
        }
    }

    /// 正文任意位置出现的路径：框架无弱提示，或任一弱提示也出现在正文中才计入
    pub fn analyze_weak(catalog: &SignalCatalog, html: &str, out: &mut Vec<Evidence>) {
        let lowered = html.to_lowercase();
        for hit in catalog.matches(Category::Path, &Signal::Text(html)) {
            let hints = catalog.weak_hints_for(&hit.framework);
            let confirmed = hints.is_empty() || hints.iter().any(|h| lowered.contains(h.as_str()));
            if !confirmed {
                debug!("弱路径缺少佐证，跳过：框架={}，路径={}", hit.framework, hit.pattern);
                continue;
            }
            let line = SnippetExtractor::line_or_fragment(&hit.fragment, html, SNIPPET_MAX_LEN);
            let source = format!("weak-path:{},line:{}", hit.pattern, line);
            record(out, hit, Channel::Direct, source);
        }
    }
}

/// 主请求文档分析
pub struct DocumentAnalyzer;

impl DocumentAnalyzer {
    pub fn analyze(catalog: &SignalCatalog, document: &FetchedDocument) -> Vec<Evidence> {
        let mut out = Vec::new();
        let extracted = HtmlExtractor::new().extract(&document.body);

        HeaderAnalyzer::analyze(catalog, &document.headers, Channel::Direct, &mut out);
        CookieAnalyzer::analyze(catalog, &document.cookies, &mut out);
        MetaAnalyzer::analyze(catalog, &extracted.get_generators(), &mut out);
        HtmlAnalyzer::analyze(catalog, &document.body, None, &mut out);
        ScriptAnalyzer::analyze_srcs(catalog, &extracted.get_script_srcs(), &mut out);
        ScriptAnalyzer::analyze_inline(catalog, &extracted.get_inline_scripts(), &mut out);
        PathAnalyzer::analyze_refs(catalog, &extracted.get_asset_refs(), &mut out);
        PathAnalyzer::analyze_weak(catalog, &document.body, &mut out);

        debug!("文档分析完成：{}，证据{}条", document.url, out.len());
        out
    }
}

/// 探测页面分析
pub struct ProbeAnalyzer;

impl ProbeAnalyzer {
    /// 错误页正文匹配错误片段
    pub fn analyze_error_page(catalog: &SignalCatalog, body: &str) -> Vec<Evidence> {
        let mut out = Vec::new();
        for hit in catalog.matches(Category::ErrorSnippet, &Signal::Text(body)) {
            let source = format!("error:{}", hit.pattern);
            record(&mut out, hit, Channel::Direct, source);
        }
        out
    }

    /// 常见路径页面只做HTML匹配
    pub fn analyze_common_path(catalog: &SignalCatalog, path: &str, body: &str) -> Vec<Evidence> {
        let mut out = Vec::new();
        HtmlAnalyzer::analyze(catalog, body, Some(path), &mut out);
        out
    }
}

/// 渲染结果分析，产出的证据全部属于渲染通道
pub struct RenderAnalyzer;

impl RenderAnalyzer {
    pub fn analyze(catalog: &SignalCatalog, trace: &RenderTrace) -> Vec<Evidence> {
        let mut out = Vec::new();

        for headers in &trace.responses {
            HeaderAnalyzer::analyze(catalog, headers, Channel::Rendered, &mut out);
        }
        Self::analyze_dom(catalog, &trace.dom, &mut out);
        Self::analyze_scripts(catalog, trace, &mut out);
        Self::analyze_console(catalog, &trace.console, &mut out);

        debug!("渲染分析完成，证据{}条", out.len());
        out
    }

    fn analyze_dom(catalog: &SignalCatalog, dom: &str, out: &mut Vec<Evidence>) {
        for hit in catalog.match_dom_hints(dom) {
            let line = SnippetExtractor::line_or_fragment(&hit.fragment, dom, SNIPPET_MAX_LEN);
            record(out, hit, Channel::Rendered, format!("render:dom,line:{}", line));
        }
    }

    fn analyze_scripts(catalog: &SignalCatalog, trace: &RenderTrace, out: &mut Vec<Evidence>) {
        for script in &trace.scripts {
            let src = script.src.as_deref().unwrap_or_default().trim().to_lowercase();
            if catalog.is_excluded_script(&src) {
                continue;
            }
            let text = script.text.to_lowercase();
            let shown = if src.is_empty() { text.trim() } else { src.as_str() };
            let source = format!("render:script,line:{}", SnippetExtractor::truncate(shown, SHORT_SNIPPET_MAX_LEN));

            for key in catalog.script_keys() {
                if key.src_regex.is_match(&src) || key.text_regex.is_match(&text) {
                    debug!("渲染脚本关键字命中：框架={}，关键字={}", key.framework, key.key);
                    out.push(Evidence::new(
                        key.framework.clone(),
                        Category::Script,
                        Channel::Rendered,
                        key.key.clone(),
                        source.clone(),
                    ));
                }
            }

            if !text.trim().is_empty() {
                for hit in catalog.match_inline_script(&text) {
                    record(out, hit, Channel::Rendered, source.clone());
                }
            }
        }
    }

    // 控制台输出与各框架弱提示比对，每行每个框架最多计一次
    fn analyze_console(catalog: &SignalCatalog, console: &[String], out: &mut Vec<Evidence>) {
        for line in console {
            let lowered = line.to_lowercase();
            for (framework, hints) in catalog.weak_hints() {
                let Some(hint) = hints.iter().find(|h| lowered.contains(h.as_str())) else {
                    continue;
                };
                let source = format!(
                    "render:console,line:{}",
                    SnippetExtractor::truncate(&lowered, SHORT_SNIPPET_MAX_LEN)
                );
                debug!("控制台输出命中：框架={}，提示={}", framework, hint);
                out.push(Evidence::new(
                    framework.clone(),
                    Category::ErrorSnippet,
                    Channel::Rendered,
                    hint.clone(),
                    source,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RenderedScript;
    use crate::detector::Tier;
    use crate::rule::CatalogLoader;
    use url::Url;

    fn document(headers: &[(&str, &str)], cookies: &[(&str, &str)], body: &str) -> FetchedDocument {
        let pairs = |items: &[(&str, &str)]| {
            items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Vec<_>>()
        };
        FetchedDocument {
            url: Url::parse("https://example.com/").unwrap(),
            status: 200,
            headers: pairs(headers),
            cookies: pairs(cookies),
            body: body.to_string(),
        }
    }

    fn sources(evidence: &[Evidence]) -> Vec<&str> {
        evidence.iter().map(Evidence::source).collect()
    }

    #[test]
    fn test_header_gated_and_flat() {
        let catalog = CatalogLoader::embedded().unwrap();
        let doc = document(&[("x-powered-by", "PHP/8.2 Laravel"), ("x-runtime", "0.0123")], &[], "");
        let evidence = DocumentAnalyzer::analyze(&catalog, &doc);

        let tags = sources(&evidence);
        assert!(tags.contains(&"header:x-powered-by,line:php/8.2 laravel"));
        assert!(tags.contains(&"header:x-runtime"));
        assert!(evidence.iter().all(|e| e.tier() == Tier::Strong));
    }

    #[test]
    fn test_header_case_insensitive() {
        let catalog = CatalogLoader::embedded().unwrap();
        let lower = DocumentAnalyzer::analyze(&catalog, &document(&[("X-Powered-By", "Laravel")], &[], ""));
        let upper = DocumentAnalyzer::analyze(&catalog, &document(&[("x-powered-by", "LARAVEL")], &[], ""));
        let names = |e: &[Evidence]| e.iter().map(|x| x.framework().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&lower), names(&upper));
        assert_eq!(names(&lower), vec!["Laravel".to_string()]);
    }

    #[test]
    fn test_cookie_source() {
        let catalog = CatalogLoader::embedded().unwrap();
        let doc = document(&[], &[("laravel_session", "abc")], "");
        let evidence = DocumentAnalyzer::analyze(&catalog, &doc);
        assert_eq!(sources(&evidence), vec!["cookie:laravel_session,line:laravel_session=abc"]);
        assert_eq!(evidence[0].framework(), "Laravel");
    }

    #[test]
    fn test_body_signals() {
        let catalog = CatalogLoader::embedded().unwrap();
        let body = r#"<html>
<head><meta name="generator" content="Hugo 0.111"></head>
<body ng-app="demo">
<script src="/static/vue.min.js"></script>
<script>React.createElement('div')</script>
</body></html>"#;
        let evidence = DocumentAnalyzer::analyze(&catalog, &document(&[], &[], body));
        let tags = sources(&evidence);

        assert!(tags.contains(&"meta:generator,line:hugo 0.111"));
        assert!(tags.contains(&"html:ng-app,line:<body ng-app=\"demo\">"));
        assert!(tags.iter().any(|t| t.starts_with("script:") && t.ends_with(",line:/static/vue.min.js")));
        assert!(tags.contains(&"script:inline,line:React.createElement('div')"));
    }

    #[test]
    fn test_asset_path_and_weak_path() {
        let catalog = CatalogLoader::embedded().unwrap();
        let body = r#"<link href="/packs/app.css" rel="stylesheet">"#;
        let evidence = DocumentAnalyzer::analyze(&catalog, &document(&[], &[], body));
        let tags = sources(&evidence);
        assert!(tags.contains(&"path:/packs/,line:/packs/app.css"));
        // /packs/ 本身就是 Rails 的弱提示
        assert!(tags.iter().any(|t| t.starts_with("weak-path:/packs/,line:")));
        assert!(evidence.iter().all(|e| e.framework() == "Ruby on Rails"));
    }

    #[test]
    fn test_path_key_does_not_match_plain_word() {
        let catalog = CatalogLoader::embedded().unwrap();
        let evidence = DocumentAnalyzer::analyze(&catalog, &document(&[], &[], "<p>We build websites</p>"));
        assert!(evidence.iter().all(|e| e.framework() != "Next.js/Nuxt.js"));
        assert!(sources(&evidence).iter().all(|t| !t.starts_with("weak-path:") && !t.starts_with("path:")));
    }

    #[test]
    fn test_multiline_html_hit_keeps_fragment() {
        let catalog = CatalogLoader::compile_json(r#"{"html": {"/<div\\s+data-v-[0-9a-f]{8}/": "Vue.js"}}"#).unwrap();
        let mut out = Vec::new();
        HtmlAnalyzer::analyze(&catalog, "<div\n  data-v-7ba5bd90>", None, &mut out);
        assert_eq!(sources(&out), vec![r"html:<div\s+data-v-[0-9a-f]{8},line:<div data-v-7ba5bd90"]);
    }

    #[test]
    fn test_weak_path_requires_hint() {
        let catalog = CatalogLoader::embedded().unwrap();
        // WebResource.axd 出现在正文，但没有任何 ASP.NET 弱提示
        let evidence = DocumentAnalyzer::analyze(&catalog, &document(&[], &[], "<p>/scripts/WebResource.axd?d=1</p>"));
        assert!(evidence.is_empty());

        let body = "<p>/scripts/WebResource.axd?d=1 .aspxauth</p>";
        let evidence = DocumentAnalyzer::analyze(&catalog, &document(&[], &[], body));
        assert_eq!(sources(&evidence), vec!["weak-path:/scripts/webresource.axd,line:<p>/scripts/WebResource.axd?d=1 .aspxauth</p>"]);
        assert_eq!(evidence[0].framework(), "ASP.NET");
        assert_eq!(evidence[0].tier(), Tier::Weak);
    }

    #[test]
    fn test_probe_analyzers() {
        let catalog = CatalogLoader::embedded().unwrap();
        let evidence = ProbeAnalyzer::analyze_error_page(&catalog, "ActionController::RoutingError (No route)");
        assert_eq!(sources(&evidence), vec!["error:actioncontroller::routingerror"]);
        assert_eq!(evidence[0].framework(), "Ruby on Rails");

        let evidence = ProbeAnalyzer::analyze_common_path(&catalog, "/login", "<form x-data=\"{}\">");
        assert_eq!(sources(&evidence), vec!["html:x-data,path:/login,line:<form x-data=\"{}\">"]);
    }

    #[test]
    fn test_render_trace() {
        let catalog = CatalogLoader::embedded().unwrap();
        let trace = RenderTrace {
            responses: vec![vec![("x-powered-by".into(), "Express".into())]],
            dom: "<div id=\"root\" data-reactroot=\"\"></div>".into(),
            scripts: vec![
                RenderedScript { src: Some("https://www.googletagmanager.com/gtm.js?id=1".into()), text: String::new() },
                RenderedScript { src: Some("/_next/static/chunks/next.runtime.js".into()), text: String::new() },
                RenderedScript { src: None, text: "new Vue({el: '#app'})".into() },
            ],
            console: vec!["Download the Vue Devtools; ko.observable ready".into()],
        };
        let evidence = RenderAnalyzer::analyze(&catalog, &trace);
        assert!(evidence.iter().all(|e| e.channel() == Channel::Rendered && e.tier() == Tier::Strong));

        let tags = sources(&evidence);
        assert!(tags.contains(&"render:header:x-powered-by,line:express"));
        assert!(tags.contains(&"render:dom,line:<div id=\"root\" data-reactroot=\"\"></div>"));
        assert!(tags.contains(&"render:script,line:/_next/static/chunks/next.runtime.js"));
        assert!(!tags.iter().any(|t| t.contains("googletagmanager")));

        let frameworks: Vec<&str> = evidence.iter().map(Evidence::framework).collect();
        assert!(frameworks.contains(&"Express.js"));
        assert!(frameworks.contains(&"React"));
        assert!(frameworks.contains(&"Next.js"));
        assert!(frameworks.contains(&"Vue.js"));
        assert!(frameworks.contains(&"Knockout.js"));
    }
}
