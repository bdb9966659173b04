//! 网页抓取工具：可选域名白名单、超时、结果大小限制
//!
//! 从输入中取第一个 http(s) URL；GET 请求带超时与 User-Agent；
//! 对 HTML 响应使用 html2text 提取可读文本，响应超过 max_result_chars 时截断。

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::tools::{Tool, ToolOutput};

const USER_AGENT: &str = concat!("agentforge/", env!("CARGO_PKG_VERSION"));

/// html2text 的排版宽度
const TEXT_WIDTH: usize = 120;

/// 解析 http(s) URL，返回小写 host；userinfo、端口与路径不计入
fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Content-Type 声明为 HTML，或正文以文档标记开头
fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("html")) {
        return true;
    }
    let head: String = body.trim_start().chars().take(16).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// 去掉 script/style 块与所有标签，折叠空白
fn strip_tags(html: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = TAGS
        .get_or_init(|| Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<[^>]*>").ok())
        .as_ref()
    else {
        return html.split_whitespace().collect::<Vec<_>>().join(" ");
    };
    re.replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML → 可读文本；html2text 失败或结果为空时退回 strip_tags
fn readable_text(html: &str) -> String {
    match from_read(html.as_bytes(), TEXT_WIDTH) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_tags(html),
    }
}

/// 从任意文本中取第一个 URL（去掉句末标点）
fn extract_url(input: &str) -> Option<String> {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    let re = URL
        .get_or_init(|| Regex::new(r#"https?://[^\s<>"']+"#).ok())
        .as_ref()?;
    re.find(input)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', ')', '!', '?']).to_string())
}

/// 网页抓取工具
pub struct WebFetchTool {
    name: String,
    client: Client,
    allowed_domains: HashSet<String>,
    max_result_chars: usize,
}

impl WebFetchTool {
    /// allowed_domains 为空时不限制域名
    pub fn new(
        name: impl Into<String>,
        allowed_domains: Vec<String>,
        timeout_secs: u64,
        max_result_chars: usize,
    ) -> Self {
        let allowed_domains = allowed_domains
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            name: name.into(),
            client,
            allowed_domains,
            max_result_chars,
        }
    }

    fn is_allowed(&self, url: &str) -> Result<(), String> {
        let host = host_of(url).ok_or_else(|| format!("invalid URL: {url}"))?;
        if self.allowed_domains.is_empty() || self.allowed_domains.contains(&host) {
            return Ok(());
        }
        Err(format!("Domain not in allowlist: {host}"))
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        self.is_allowed(url)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;

        let body = body.trim_start_matches('\u{FEFF}');
        let text = if is_html(content_type.as_deref(), body) {
            readable_text(body)
        } else {
            body.to_string()
        };

        Ok(text.trim().chars().take(self.max_result_chars).collect())
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Fetch the first URL found in the input and return its readable text (truncated)."
    }

    async fn execute(&self, input: &str) -> Result<ToolOutput, String> {
        let url = extract_url(input).ok_or_else(|| "WEB_ERROR: no URL found in input".to_string())?;
        tracing::info!(url = %url, "web fetch");
        self.fetch(&url)
            .await
            .map(ToolOutput::Text)
            .map_err(|e| format!("WEB_ERROR: {e}"))
    }
}
