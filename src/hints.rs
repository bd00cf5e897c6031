use std::fmt;

use reqwest::Url;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintRel {
    Preconnect,
    DnsPrefetch,
    Preload,
    Prefetch,
}

impl HintRel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HintRel::Preconnect => "preconnect",
            HintRel::DnsPrefetch => "dns-prefetch",
            HintRel::Preload => "preload",
            HintRel::Prefetch => "prefetch",
        }
    }
}

/// 一条 `<link>` 资源提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHint {
    pub rel: HintRel,
    pub href: String,
    /// preload 的资源类型，如 `script`、`style`、`font`
    pub as_type: Option<String>,
    pub crossorigin: bool,
}

impl fmt::Display for LinkHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<link rel=\"{}\" href=\"{}\"", self.rel.as_str(), escape_attr(&self.href))?;
        if let Some(as_type) = &self.as_type {
            write!(f, " as=\"{}\"", escape_attr(as_type))?;
        }
        if self.crossorigin {
            write!(f, " crossorigin")?;
        }
        write!(f, ">")
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 资源提示登记表，按 (rel, href) 去重
#[derive(Debug, Default)]
pub struct ResourceHints {
    links: Vec<LinkHint>,
}

impl ResourceHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预连接到目标源，只保留 scheme://host:port
    pub fn preconnect(&mut self, url: &str, crossorigin: bool) -> Result<bool, AppError> {
        let origin = origin_of(url)?;
        Ok(self.insert(LinkHint {
            rel: HintRel::Preconnect,
            href: origin,
            as_type: None,
            crossorigin,
        }))
    }

    pub fn dns_prefetch(&mut self, url: &str) -> Result<bool, AppError> {
        let origin = origin_of(url)?;
        Ok(self.insert(LinkHint {
            rel: HintRel::DnsPrefetch,
            href: origin,
            as_type: None,
            crossorigin: false,
        }))
    }

    pub fn preload(&mut self, url: &str, as_type: &str) -> Result<bool, AppError> {
        let href = parse(url)?.to_string();
        // 字体预加载必须带 crossorigin，否则浏览器会重复下载
        let crossorigin = as_type == "font";
        Ok(self.insert(LinkHint {
            rel: HintRel::Preload,
            href,
            as_type: Some(as_type.to_string()),
            crossorigin,
        }))
    }

    pub fn prefetch(&mut self, url: &str) -> Result<bool, AppError> {
        let href = parse(url)?.to_string();
        Ok(self.insert(LinkHint {
            rel: HintRel::Prefetch,
            href,
            as_type: None,
            crossorigin: false,
        }))
    }

    pub fn links(&self) -> &[LinkHint] {
        &self.links
    }

    /// 输出全部 `<link>` 标签，每行一个
    pub fn render(&self) -> String {
        self.links
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn insert(&mut self, hint: LinkHint) -> bool {
        let exists = self
            .links
            .iter()
            .any(|l| l.rel == hint.rel && l.href == hint.href);
        if exists {
            return false;
        }
        tracing::debug!("Registered {} hint for {}", hint.rel.as_str(), hint.href);
        self.links.push(hint);
        true
    }
}

fn parse(url: &str) -> Result<Url, AppError> {
    Url::parse(url).map_err(|e| AppError::InvalidUrl(format!("{}: {}", url, e)))
}

fn origin_of(url: &str) -> Result<String, AppError> {
    let parsed = parse(url)?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(AppError::InvalidUrl(format!("{}: no network origin", url)));
    }
    Ok(origin.ascii_serialization())
}
