use std::fmt;

use serde::{Deserialize, Serialize};

/// 渲染后的题目页面
///
/// 每轮由抓取器创建，只属于这一轮，驱动器消费后丢弃。
#[derive(Debug, Clone, Default)]
pub struct QuizPage {
    pub url: String,
    /// 可见文本 (`document.body.innerText`)
    pub raw_content: String,
    pub html: String,
    /// 页面内所有链接（已转为绝对地址）
    pub links: Vec<String>,
    /// 页面内嵌的表格（CSV 文本）
    pub dataset: Option<DatasetRef>,
}

impl QuizPage {
    /// 只有文本的页面（测试和简单抓取器用）
    pub fn from_text(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_content: text.into(),
            ..Default::default()
        }
    }
}

/// 题目附带的数据集
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetRef {
    /// CSV 文件地址
    Url(String),
    /// 页面内嵌的 CSV 文本
    Inline(String),
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetRef::Url(url) => write!(f, "{}", url),
            DatasetRef::Inline(text) => write!(f, "<内嵌表格 {} 行>", text.lines().count()),
        }
    }
}

/// 期望的答案类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    FreeText,
    Numeric,
    DatasetDerived,
}

/// 结构化的题目描述，构建后只读
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDescription {
    /// 题目所在页面
    pub quiz_url: String,
    pub prompt_text: String,
    pub answer_kind: AnswerKind,
    pub dataset_ref: Option<DatasetRef>,
    /// 答案提交地址
    pub submit_url: String,
    /// 题目要求抓取的附加页面
    pub scrape_ref: Option<String>,
}

/// 答案取值，提交时原样序列化为 JSON 值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// 数值结果：整数用 Integer 表示
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            AnswerValue::Integer(value as i64)
        } else {
            AnswerValue::Number(value)
        }
    }

    /// 文本能解析成数字时转为数值，否则保持文本
    pub fn numeric_or_text(text: &str) -> Self {
        let cleaned = text.trim().replace(',', "");
        if let Ok(n) = cleaned.parse::<i64>() {
            return AnswerValue::Integer(n);
        }
        match cleaned.parse::<f64>() {
            Ok(n) if n.is_finite() => AnswerValue::Number(n),
            _ => AnswerValue::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AnswerValue::Text(t) if t.trim().is_empty())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Bool(b) => write!(f, "{}", b),
            AnswerValue::Integer(n) => write!(f, "{}", n),
            AnswerValue::Number(n) => write!(f, "{}", n),
            AnswerValue::Text(t) => write!(f, "{}", t),
        }
    }
}

/// 作答结果，由提交器消费一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub value: AnswerValue,
    pub kind: AnswerKind,
}

impl Answer {
    pub fn new(value: AnswerValue, kind: AnswerKind) -> Self {
        Self { value, kind }
    }
}

/// 一次提交的完整内容
#[derive(Debug, Clone)]
pub struct Submission {
    pub submit_url: String,
    pub quiz_url: String,
    pub email: String,
    pub secret: String,
    pub answer: Answer,
}

/// 提交结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResult {
    pub accepted: bool,
    pub next_url: Option<String>,
    /// 链已结束
    pub terminal: bool,
    pub message: Option<String>,
}

impl SubmitResult {
    /// 答对，继续下一题
    pub fn accepted(next_url: impl Into<String>) -> Self {
        Self {
            accepted: true,
            next_url: Some(next_url.into()),
            ..Default::default()
        }
    }

    /// 答错，转到指定页面
    pub fn rejected(next_url: impl Into<String>, message: Option<String>) -> Self {
        Self {
            accepted: false,
            next_url: Some(next_url.into()),
            terminal: false,
            message,
        }
    }

    /// 最后一题
    pub fn terminal(accepted: bool) -> Self {
        Self {
            accepted,
            terminal: true,
            ..Default::default()
        }
    }
}
