//! 扫描目标：原始主机串与待尝试的URL变体

use std::fmt;
use url::Url;

use crate::error::{FingerprintError, FpResult};

/// 单个扫描目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    variants: Vec<Url>,
}

impl Target {
    /// 解析目标：无协议前缀时依次尝试https与http，带协议时只用该URL
    pub fn parse(raw: &str) -> FpResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FingerprintError::InvalidInput("目标为空".to_string()));
        }

        let variants = if has_scheme(trimmed) {
            vec![Url::parse(trimmed)?]
        } else {
            vec![
                Url::parse(&format!("https://{}", trimmed))?,
                Url::parse(&format!("http://{}", trimmed))?,
            ]
        };

        if variants.iter().any(|url| url.host_str().is_none_or(str::is_empty)) {
            return Err(FingerprintError::InvalidInput(format!("目标缺少主机名：{}", trimmed)));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            variants,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 按尝试顺序排列的URL变体
    pub fn variants(&self) -> &[Url] {
        &self.variants
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn has_scheme(input: &str) -> bool {
    let lowered = input.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_both_schemes() {
        let target = Target::parse("  example.com ").unwrap();
        assert_eq!(target.raw(), "example.com");
        let urls: Vec<&str> = target.variants().iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://example.com/", "http://example.com/"]);
    }

    #[test]
    fn test_scheme_qualified_is_single_variant() {
        let target = Target::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(target.variants().len(), 1);
        assert_eq!(target.variants()[0].as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_invalid_targets() {
        assert!(matches!(Target::parse("   "), Err(FingerprintError::InvalidInput(_))));
        assert!(Target::parse("http://").is_err());
        assert!(Target::parse("exa mple.com").is_err());
    }
}
