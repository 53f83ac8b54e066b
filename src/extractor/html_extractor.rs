//! HTML标签提取器
//! 负责从HTML中提取script（外链地址与内联内容）、meta标签以及静态资源引用

use std::cell::{Cell, RefCell};
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    script_srcs: RefCell<Vec<String>>,
    inline_scripts: RefCell<Vec<String>>,
    meta_tags: RefCell<Vec<(String, String)>>,
    asset_refs: RefCell<Vec<String>>,
    // 当前是否位于<script>内部（内层值表示是否带src）
    in_script: Cell<Option<bool>>,
    script_buffer: RefCell<String>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) if tag.kind == TagKind::StartTag => match tag.name.as_ref() {
                "script" => {
                    let has_src = self.extract_script_src(&tag.attrs);
                    self.extract_asset_refs(&tag.attrs);
                    if !tag.self_closing {
                        // 切换到脚本数据状态，避免脚本内容被当作标签解析
                        self.in_script.set(Some(has_src));
                        self.script_buffer.borrow_mut().clear();
                        return TokenSinkResult::RawData(RawKind::ScriptData);
                    }
                }
                "link" | "img" => self.extract_asset_refs(&tag.attrs),
                "meta" => self.extract_meta_tags(&tag.attrs),
                _ => {}
            },
            Token::TagToken(tag) if tag.kind == TagKind::EndTag && tag.name.as_ref() == "script" => {
                self.finish_script();
            }
            Token::CharacterTokens(text) => {
                if self.in_script.get().is_some() {
                    self.script_buffer.borrow_mut().push_str(&text);
                }
            }
            Token::EOFToken => self.finish_script(),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取标签
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    /// 提取script-src，返回是否存在src
    fn extract_script_src(&self, attrs: &[Attribute]) -> bool {
        for attr in attrs {
            if attr.name.local.as_ref() == "src" {
                let src = attr.value.trim();
                if !src.is_empty() {
                    self.script_srcs.borrow_mut().push(src.to_string());
                    return true;
                }
            }
        }
        false
    }

    /// 提取src/href资源引用
    fn extract_asset_refs(&self, attrs: &[Attribute]) {
        for attr in attrs {
            if matches!(attr.name.local.as_ref(), "src" | "href") && !attr.value.is_empty() {
                self.asset_refs.borrow_mut().push(attr.value.to_string());
            }
        }
    }

    /// 提取meta标签
    fn extract_meta_tags(&self, attrs: &[Attribute]) {
        let mut name = None;
        let mut content = None;

        for attr in attrs {
            match attr.name.local.as_ref() {
                "name" => name = Some(attr.value.to_string().to_lowercase()),
                "content" => content = Some(attr.value.to_string()),
                _ => {}
            }
        }

        if let (Some(n), Some(c)) = (name, content) {
            self.meta_tags.borrow_mut().push((n, c));
        }
    }

    /// 脚本结束：无src的脚本内容记为内联脚本
    fn finish_script(&self) {
        if let Some(has_src) = self.in_script.take() {
            let text = std::mem::take(&mut *self.script_buffer.borrow_mut());
            if !has_src && !text.trim().is_empty() {
                self.inline_scripts.borrow_mut().push(text.trim().to_string());
            }
        }
    }

    /// 获取提取到的script-src列表
    pub fn get_script_srcs(&self) -> Vec<String> {
        self.script_srcs.borrow().clone()
    }

    /// 获取提取到的内联脚本列表
    pub fn get_inline_scripts(&self) -> Vec<String> {
        self.inline_scripts.borrow().clone()
    }

    /// 获取提取到的meta标签列表
    pub fn get_meta_tags(&self) -> Vec<(String, String)> {
        self.meta_tags.borrow().clone()
    }

    /// 获取generator的内容列表
    pub fn get_generators(&self) -> Vec<String> {
        self.meta_tags
            .borrow()
            .iter()
            .filter(|(name, _)| name == "generator")
            .map(|(_, content)| content.clone())
            .collect()
    }

    /// 获取script/link/img的src与href
    pub fn get_asset_refs(&self) -> Vec<String> {
        self.asset_refs.borrow().clone()
    }
}
