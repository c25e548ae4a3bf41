//! 浏览器页面抓取
//!
//! 每次抓取开一个新标签页，渲染后用脚本取出文本、HTML、链接和表格，再关闭标签页。

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Browser;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::clients::PageFetcher;
use crate::config::Config;
use crate::error::{AppResult, FetchError};
use crate::infrastructure::JsExecutor;
use crate::models::{DatasetRef, QuizPage};

/// 页面内容提取脚本
///
/// `status` 来自 Navigation Timing，浏览器不支持时为 0。
const EXTRACT_SCRIPT: &str = r##"
(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    const quote = (v) => /[",\n]/.test(v) ? '"' + v.replace(/"/g, '""') + '"' : v;
    const tables = Array.from(document.querySelectorAll('table')).map(t =>
        Array.from(t.rows)
            .map(r => Array.from(r.cells).map(c => quote(c.innerText.trim())).join(','))
            .join('\n'));
    return {
        text: document.body ? document.body.innerText : '',
        html: document.documentElement ? document.documentElement.outerHTML : '',
        links: Array.from(document.querySelectorAll('a[href]')).map(a => a.href),
        tables: tables,
        status: nav && nav.responseStatus ? nav.responseStatus : 0
    };
})()
"##;

/// 脚本返回的原始结构
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RenderedPage {
    text: String,
    html: String,
    links: Vec<String>,
    tables: Vec<String>,
    status: u16,
}

impl RenderedPage {
    fn into_quiz_page(self, url: &str) -> QuizPage {
        let dataset = self
            .tables
            .into_iter()
            .find(|t| !t.trim().is_empty())
            .map(DatasetRef::Inline);

        QuizPage {
            url: url.to_string(),
            raw_content: self.text,
            html: self.html,
            links: self.links,
            dataset,
        }
    }
}

/// 基于 chromiumoxide 的页面抓取器
pub struct BrowserPageFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    settle_delay: Duration,
}

impl BrowserPageFetcher {
    pub fn new(browser: Browser, handler: JoinHandle<()>, settle_delay: Duration) -> Self {
        Self {
            browser,
            handler,
            settle_delay,
        }
    }

    /// 按配置启动（或连接）浏览器
    pub async fn start(config: &Config) -> AppResult<Self> {
        let (browser, handler) = crate::browser::start_browser(config).await?;
        Ok(Self::new(browser, handler, config.settle_delay()))
    }

    async fn render(&self, executor: &JsExecutor, url: &str) -> Result<RenderedPage, FetchError> {
        executor
            .goto(url)
            .await
            .map_err(|source| FetchError::Navigation {
                url: url.to_string(),
                source,
            })?;

        // 等待页面脚本把题目渲染出来
        sleep(self.settle_delay).await;

        executor
            .eval_as::<RenderedPage>(EXTRACT_SCRIPT)
            .await
            .map_err(|e| FetchError::Render {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl PageFetcher for BrowserPageFetcher {
    async fn fetch(&self, url: &str) -> Result<QuizPage, FetchError> {
        debug!("打开新标签页: {}", url);
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|source| FetchError::Navigation {
                url: url.to_string(),
                source,
            })?;

        let executor = JsExecutor::new(page);
        let rendered = self.render(&executor, url).await;

        if let Err(e) = executor.close().await {
            warn!("关闭标签页失败: {}", e);
        }

        let rendered = rendered?;
        if rendered.status >= 400 {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: rendered.status,
            });
        }

        debug!(
            "✓ 提取到 {} 字符文本, {} 字符 HTML, {} 个链接",
            rendered.text.len(),
            rendered.html.len(),
            rendered.links.len()
        );
        Ok(rendered.into_quiz_page(url))
    }
}

impl Drop for BrowserPageFetcher {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_table_becomes_dataset() {
        let rendered = RenderedPage {
            text: "Sum the values".into(),
            tables: vec!["  ".into(), "a,b\n1,2".into()],
            ..Default::default()
        };
        let page = rendered.into_quiz_page("https://quiz.test/q1");
        assert_eq!(page.url, "https://quiz.test/q1");
        assert_eq!(page.dataset, Some(DatasetRef::Inline("a,b\n1,2".into())));
    }

    #[test]
    fn test_rendered_page_tolerates_missing_fields() {
        let rendered: RenderedPage = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(rendered.status, 0);
        assert!(rendered.links.is_empty());
    }

    /// 需要本机安装 Chrome
    #[tokio::test]
    #[ignore]
    async fn test_fetch_live_page() {
        let _ = tracing_subscriber::fmt::try_init();
        let fetcher = BrowserPageFetcher::start(&Config::default()).await.unwrap();
        let page = fetcher.fetch("https://example.com").await.unwrap();
        assert!(page.raw_content.contains("Example Domain"));
    }
}
