//! Header格式转换工具
//! 不同Header格式之间的转换，以及Set-Cookie解析

use std::time::Instant;
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为有序键值对（名称小写，值保留原文）
    pub fn to_pairs(header_map: &HeaderMap) -> Vec<(String, String)> {
        let start = Instant::now();
        let mut pairs = Vec::with_capacity(header_map.len());
        let mut iter_count = 0;

        for (key, value) in header_map.iter() {
            iter_count += 1;
            if iter_count > 1000 {
                warn!("Header iteration exceeded 1000 entries, truncated");
                break;
            }

            let value_str = String::from_utf8_lossy(value.as_bytes()).into_owned();
            pairs.push((key.as_str().to_lowercase(), value_str));
        }

        debug!("Headers converted in {:?}, {} entries", start.elapsed(), pairs.len());
        pairs
    }

    /// 从Header键值对中解析Set-Cookie，得到 (Cookie名小写, 值)
    pub fn parse_set_cookies(headers: &[(String, String)]) -> Vec<(String, String)> {
        headers
            .iter()
            .filter(|(name, _)| name == "set-cookie")
            .filter_map(|(_, raw)| Self::parse_set_cookie(raw))
            .collect()
    }

    // 只取首个键值段，过滤空名称与deleted值
    fn parse_set_cookie(raw_cookie: &str) -> Option<(String, String)> {
        let cookie_str = raw_cookie.trim();
        let core_kv = cookie_str.split(';').map(str::trim).find(|s| !s.is_empty())?;

        let pos = core_kv.find('=')?;
        let (name, value) = (core_kv[..pos].trim(), core_kv[pos + 1..].trim());

        if name.is_empty() || value.eq_ignore_ascii_case("deleted") {
            return None;
        }

        Some((name.to_ascii_lowercase(), value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, SET_COOKIE};

    #[test]
    fn test_to_pairs_lowercases_names() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Powered-By", HeaderValue::from_static("Laravel"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        let pairs = HeaderConverter::to_pairs(&headers);
        assert!(pairs.contains(&("x-powered-by".to_string(), "Laravel".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "set-cookie").count(), 2);
    }

    #[test]
    fn test_parse_set_cookies() {
        let headers = vec![
            ("set-cookie".to_string(), "Laravel_Session=abc; path=/; HttpOnly".to_string()),
            ("set-cookie".to_string(), "csrftoken=deleted; Max-Age=0".to_string()),
            ("set-cookie".to_string(), "=novalue".to_string()),
            ("content-type".to_string(), "text/html".to_string()),
        ];
        let cookies = HeaderConverter::parse_set_cookies(&headers);
        assert_eq!(cookies, vec![("laravel_session".to_string(), "abc".to_string())]);
    }
}
