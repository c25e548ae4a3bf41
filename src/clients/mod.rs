//! 外部协作方
//!
//! 这里只定义链驱动器依赖的四个接口，以及它们的具体实现：
//! - `PageFetcher` → `BrowserPageFetcher`（chromiumoxide 渲染页面）
//! - `LanguageModel` → `LlmClient`（OpenAI 兼容接口）
//! - `DatasetAnalyzer` → `CsvAnalyzer`（CSV 统计）
//! - `Submitter` → `HttpSubmitter`（reqwest 提交答案）
//!
//! 各实现不持有跨请求的可变状态。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AnswerError, FetchError, SubmitError};
use crate::models::{AnswerValue, DatasetRef, QuizPage, Submission, SubmitResult};

pub mod browser_fetcher;
pub mod csv_analyzer;
pub mod llm_client;
pub mod submit_client;

pub use browser_fetcher::BrowserPageFetcher;
pub use csv_analyzer::CsvAnalyzer;
pub use llm_client::LlmClient;
pub use submit_client::HttpSubmitter;

/// 页面抓取
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<QuizPage, FetchError>;
}

/// 语言模型：输入提示词，返回文本
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError>;
}

/// 表格数据分析：输入数据集和题目，返回计算结果
#[async_trait]
pub trait DatasetAnalyzer: Send + Sync {
    async fn analyze(&self, dataset: &DatasetRef, prompt: &str) -> Result<AnswerValue, AnswerError>;
}

/// 答案提交
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<SubmitResult, SubmitError>;
}

/// 链驱动器用到的全部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub model: Arc<dyn LanguageModel>,
    pub analyzer: Arc<dyn DatasetAnalyzer>,
    pub submitter: Arc<dyn Submitter>,
}
