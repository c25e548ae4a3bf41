//! 作答策略选择 - 业务能力层
//!
//! 按固定顺序选择作答方式，第一个命中的生效：
//! 1. 有数据集 → 交给数据分析器
//! 2. 有附加抓取地址 → 抓取页面并取出 secret code
//! 3. 其他 → 直接问 LLM
//!
//! 本层不做重试，失败原样返回给链驱动器。

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};

use crate::clients::{Collaborators, DatasetAnalyzer, LanguageModel, PageFetcher};
use crate::error::AnswerError;
use crate::models::{Answer, AnswerKind, AnswerValue, DatasetRef, QuestionDescription};
use crate::utils::truncate_text;

/// 作答策略选择器
pub struct AnswerSelector {
    model: Arc<dyn LanguageModel>,
    analyzer: Arc<dyn DatasetAnalyzer>,
    fetcher: Arc<dyn PageFetcher>,
}

impl AnswerSelector {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            model: Arc::clone(&collaborators.model),
            analyzer: Arc::clone(&collaborators.analyzer),
            fetcher: Arc::clone(&collaborators.fetcher),
        }
    }

    /// 选择作答方式并给出答案
    ///
    /// # 参数
    /// - `question`: 解析好的题目
    ///
    /// # 返回
    /// 协作方失败、返回空结果或无法解析时返回 `AnswerError`
    pub async fn select_and_answer(&self, question: &QuestionDescription) -> Result<Answer, AnswerError> {
        if let Some(dataset) = &question.dataset_ref {
            return self.answer_from_dataset(dataset, &question.prompt_text).await;
        }

        if let Some(scrape_url) = &question.scrape_ref {
            return self.answer_from_scrape(scrape_url).await;
        }

        self.answer_from_model(question).await
    }

    async fn answer_from_dataset(&self, dataset: &DatasetRef, prompt: &str) -> Result<Answer, AnswerError> {
        info!("   📊 使用数据分析作答: {}", dataset);
        let value = self.analyzer.analyze(dataset, prompt).await?;
        if value.is_empty() {
            return Err(AnswerError::Empty {
                collaborator: "数据分析器",
            });
        }
        Ok(Answer::new(value, AnswerKind::DatasetDerived))
    }

    async fn answer_from_scrape(&self, scrape_url: &str) -> Result<Answer, AnswerError> {
        info!("   🔍 抓取附加页面: {}", scrape_url);
        let page = self.fetcher.fetch(scrape_url).await.map_err(AnswerError::Scrape)?;
        debug!("   → 附加页面内容: {}", truncate_text(&page.raw_content, 200));

        if let Some(code) = find_secret_code(&page.raw_content) {
            info!("   ✓ 找到 secret code: {}", code);
            return Ok(Answer::new(AnswerValue::Text(code), AnswerKind::FreeText));
        }

        debug!("   → 页面中没有明显的 secret code，交给 LLM 提取");
        let prompt = format!(
            "Extract ONLY the secret code from the following page text. \
             Reply with the code alone.\n\n{}",
            page.raw_content
        );
        let raw = self.model.complete(&prompt).await?;
        let code = normalize_model_text(&raw);
        if code.is_empty() {
            return Err(AnswerError::Empty { collaborator: "LLM" });
        }
        Ok(Answer::new(AnswerValue::Text(code), AnswerKind::FreeText))
    }

    async fn answer_from_model(&self, question: &QuestionDescription) -> Result<Answer, AnswerError> {
        info!("   🤖 使用 LLM 作答");
        let raw = self.model.complete(&question.prompt_text).await?;
        let text = normalize_model_text(&raw);
        debug!("   → LLM 回复: {}", truncate_text(&text, 100));

        if text.is_empty() {
            return Err(AnswerError::Unparseable { raw });
        }

        Ok(Answer::new(coerce(&text, question.answer_kind), AnswerKind::FreeText))
    }
}

/// secret code：先找 "secret code is N"，再找 5 位以上的数字
pub fn find_secret_code(text: &str) -> Option<String> {
    [r"(?i)secret\s+code\s+is\s+(\d+)", r"\b(\d{5,})\b"]
        .iter()
        .find_map(|pattern| {
            Regex::new(pattern)
                .ok()?
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
}

/// 清理 LLM 回复：去掉首尾空白、代码块标记和包裹的引号，保留大小写
pub fn normalize_model_text(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(inner) = text.strip_prefix("```") {
        // 去掉语言标记行，如 ```json
        let inner = match inner.split_once('\n') {
            Some((first, rest)) if !first.contains(' ') => rest,
            _ => inner,
        };
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    loop {
        let stripped = ['`', '"', '\'']
            .iter()
            .find_map(|q| text.strip_prefix(*q).and_then(|t| t.strip_suffix(*q)));
        match stripped {
            Some(inner) => text = inner.trim(),
            None => break,
        }
    }

    text.to_string()
}

/// 题目要求数值时把文本转为数字；`true` / `yes` 和 `false` / `no` 转为布尔值
fn coerce(text: &str, kind: AnswerKind) -> AnswerValue {
    if ["true", "yes"].iter().any(|w| text.eq_ignore_ascii_case(w)) {
        return AnswerValue::Bool(true);
    }
    if ["false", "no"].iter().any(|w| text.eq_ignore_ascii_case(w)) {
        return AnswerValue::Bool(false);
    }
    match kind {
        AnswerKind::Numeric => AnswerValue::numeric_or_text(text),
        _ => AnswerValue::Text(text.to_string()),
    }
}
