//! 证据片段工具
//! 为证据来源标签截取可读的上下文行

/// HTML行片段的默认最大长度
pub const SNIPPET_MAX_LEN: usize = 150;
/// 脚本/控制台片段的默认最大长度
pub const SHORT_SNIPPET_MAX_LEN: usize = 80;

/// 片段提取工具
pub struct SnippetExtractor;

impl SnippetExtractor {
    /// 返回首个包含tag（忽略大小写）的行，去除首尾空白后截断
    pub fn line_containing(tag: &str, text: &str, max_len: usize) -> String {
        let tag = tag.to_lowercase();
        text.lines()
            .find(|line| line.to_lowercase().contains(&tag))
            .map(|line| Self::truncate(line.trim(), max_len))
            .unwrap_or_default()
    }

    /// 同line_containing，片段跨行时退回为压缩空白后的片段本身
    pub fn line_or_fragment(fragment: &str, text: &str, max_len: usize) -> String {
        let line = Self::line_containing(fragment, text, max_len);
        if !line.is_empty() {
            return line;
        }
        let flattened = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::truncate(&flattened, max_len)
    }

    /// 按字符截断（不切断多字节字符）
    pub fn truncate(text: &str, max_len: usize) -> String {
        text.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_containing() {
        let html = "<html>\n   <body NG-APP=\"demo\">   \n</html>";
        assert_eq!(SnippetExtractor::line_containing("ng-app", html, 150), "<body NG-APP=\"demo\">");
        assert_eq!(SnippetExtractor::line_containing("x-data", html, 150), "");
    }

    #[test]
    fn test_line_or_fragment_spanning_lines() {
        let html = "<div\n  data-v-7ba5bd90\n>";
        assert_eq!(SnippetExtractor::line_or_fragment("data-v-7ba5bd90", html, 150), "data-v-7ba5bd90");
        assert_eq!(SnippetExtractor::line_or_fragment("<div\n  data-v", html, 150), "<div data-v");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(SnippetExtractor::truncate("框架识别引擎", 2), "框架");
        assert_eq!(SnippetExtractor::line_containing("body", "<body class='long'>", 5), "<body");
    }
}
