//! 题目解析服务
//!
//! 从渲染后的页面中识别题目文本、提交地址、数据集和附加抓取地址。
//! 同样的页面内容总是得到同样的结果。

use regex::Regex;
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::{AnswerKind, DatasetRef, QuestionDescription, QuizPage};
use crate::utils::urls::resolve;

/// 题目文本的最大长度（字符）
pub const MAX_PROMPT_CHARS: usize = 2000;

/// 提交地址的匹配规则，按顺序尝试
const SUBMIT_PATTERNS: [&str; 2] = [
    r#"(?i)POST\s+(?:to\s+)?(?:JSON\s+to\s+)?(https?://[^\s<>"']+/submit[^\s<>"']*)"#,
    r#"(?i)(https?://[^\s<>"']+/submit[^\s<>"']*)"#,
];

/// CSV 链接的匹配规则，按顺序尝试
const CSV_PATTERNS: [&str; 3] = [
    r#"(?i)(https?://[^\s<>"'()]+\.csv)"#,
    r#"(?i)href=["']([^"']+\.csv)["']"#,
    r#"(?i)\(([^)\s]+\.csv)\)"#,
];

const NUMERIC_KEYWORDS: [&str; 5] = ["how many", "count", "sum", "total", "number"];

/// 题目解析器
pub struct QuestionExtractor {
    fallback_submit_url: Option<String>,
}

impl QuestionExtractor {
    pub fn new(fallback_submit_url: Option<String>) -> Self {
        Self {
            fallback_submit_url,
        }
    }

    /// 解析页面
    ///
    /// # 参数
    /// - `page`: 抓取到的题目页面
    ///
    /// # 返回
    /// 页面为空或找不到提交地址时返回 `ExtractionError`
    pub fn extract(&self, page: &QuizPage) -> Result<QuestionDescription, ExtractionError> {
        let prompt_text = normalize_prompt(&page.raw_content);
        if prompt_text.is_empty() {
            return Err(ExtractionError::EmptyPage {
                url: page.url.clone(),
            });
        }

        let submit_url = self
            .find_submit_url(page)
            .ok_or_else(|| ExtractionError::NoSubmitUrl {
                url: page.url.clone(),
            })?;
        debug!("   → 提交地址: {}", submit_url);

        let dataset_ref = page.dataset.clone().or_else(|| find_csv_link(page));
        if let Some(dataset) = &dataset_ref {
            debug!("   → 数据集: {}", dataset);
        }

        let scrape_ref = first_capture(r"(?i)\bScrape\s+(\S+)", &page.raw_content)
            .map(|raw| trim_trailing_punctuation(&raw).to_string())
            .and_then(|raw| resolve(&page.url, &raw).ok());

        let answer_kind = if dataset_ref.is_some() {
            AnswerKind::DatasetDerived
        } else if asks_for_number(&prompt_text) {
            AnswerKind::Numeric
        } else {
            AnswerKind::FreeText
        };

        Ok(QuestionDescription {
            quiz_url: page.url.clone(),
            prompt_text,
            answer_kind,
            dataset_ref,
            submit_url,
            scrape_ref,
        })
    }

    fn find_submit_url(&self, page: &QuizPage) -> Option<String> {
        let text = &page.raw_content;

        SUBMIT_PATTERNS
            .iter()
            .find_map(|pattern| first_capture(pattern, text))
            .map(|url| trim_trailing_punctuation(&url).to_string())
            .or_else(|| {
                all_urls(text)
                    .into_iter()
                    .chain(page.links.iter().cloned())
                    .find(|url| url.to_lowercase().contains("submit"))
            })
            .or_else(|| {
                first_capture(r#"(?i)(?:^|[\s(])(/submit[^\s<>"')]*)"#, text)
                    .and_then(|path| resolve(&page.url, trim_trailing_punctuation(&path)).ok())
            })
            .or_else(|| self.fallback_submit_url.clone())
    }
}

/// 压缩空白并截断
fn normalize_prompt(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_PROMPT_CHARS)
        .collect()
}

fn asks_for_number(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    NUMERIC_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn find_csv_link(page: &QuizPage) -> Option<DatasetRef> {
    let combined = format!("{}\n{}", page.raw_content, page.html);

    CSV_PATTERNS
        .iter()
        .find_map(|pattern| first_capture(pattern, &combined))
        .map(|raw| raw.trim_matches(|c: char| "\"'()<>".contains(c)).to_string())
        .and_then(|raw| resolve(&page.url, &raw).ok())
        .map(DatasetRef::Url)
}

fn first_capture(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn all_urls(text: &str) -> Vec<String> {
    match Regex::new(r#"https?://[^\s<>"']+"#) {
        Ok(re) => re
            .find_iter(text)
            .map(|m| trim_trailing_punctuation(m.as_str()).to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// 去掉句末标点（"POST to https://x/submit." 之类）
fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', ')', ']'])
}
