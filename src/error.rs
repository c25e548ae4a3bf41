//! 错误类型
//!
//! 每个失败领域一个枚举：
//! - `FetchError` / `ExtractionError` / `AnswerError` / `SubmitError`：单步错误，可重试
//! - `StepError`：以上四者的统一包装，链驱动器只认它
//! - `ConfigError`：致命配置错误，链永远不会启动
//! - `AppError`：进程级错误（配置、浏览器、服务）

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 页面抓取错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 导航失败（不可达、DNS、连接被拒等）
    #[error("导航到 {url} 失败: {source}")]
    Navigation {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 页面返回非成功状态码
    #[error("页面 {url} 返回状态码 {status}")]
    BadStatus { url: String, status: u16 },
    /// 渲染超时
    #[error("页面 {url} 渲染超时 ({}ms)", .after.as_millis())]
    Timeout { url: String, after: Duration },
    /// 页面脚本执行失败
    #[error("页面 {url} 内容提取失败: {reason}")]
    Render { url: String, reason: String },
}

/// 题目解析错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 页面没有任何可见文本
    #[error("页面 {url} 内容为空")]
    EmptyPage { url: String },
    /// 找不到提交地址
    #[error("页面 {url} 中找不到提交地址")]
    NoSubmitUrl { url: String },
}

/// 作答错误
#[derive(Debug, Error)]
pub enum AnswerError {
    /// LLM API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    Model {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 数据集加载失败
    #[error("数据集加载失败 ({source_ref}): {reason}")]
    DatasetLoad { source_ref: String, reason: String },
    /// 数据集无法计算出结果
    #[error("数据集分析失败: {reason}")]
    Analysis { reason: String },
    /// 抓取附加页面失败
    #[error("抓取附加页面失败: {0}")]
    Scrape(#[source] FetchError),
    /// 协作方返回空结果
    #[error("{collaborator} 返回空结果")]
    Empty { collaborator: &'static str },
    /// 协作方返回内容无法解析
    #[error("无法解析返回内容: {raw}")]
    Unparseable { raw: String },
    /// 作答超时
    #[error("作答超时 ({}ms)", .after.as_millis())]
    Timeout { after: Duration },
}

/// 提交错误
#[derive(Debug, Error)]
pub enum SubmitError {
    /// 网络请求失败
    #[error("提交请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端返回非成功状态码
    #[error("提交返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 响应体不符合约定
    #[error("提交响应格式错误 ({endpoint}): {reason}")]
    Malformed { endpoint: String, reason: String },
    /// 提交超时
    #[error("提交超时 ({endpoint}, {}ms)", .after.as_millis())]
    Timeout { endpoint: String, after: Duration },
}

/// 单步错误：链驱动器在边界处捕获并转为重试
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl StepError {
    /// 错误类别
    pub fn kind(&self) -> FailureKind {
        match self {
            StepError::Fetch(_) => FailureKind::Fetch,
            StepError::Extraction(_) => FailureKind::Extraction,
            StepError::Answer(_) => FailureKind::Answer,
            StepError::Submit(_) => FailureKind::Submit,
        }
    }
}

/// 链失败类别（用于终态记录）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Extraction,
    Answer,
    Submit,
    /// 请求被取消（进程关闭等）
    Cancelled,
    /// next_url 指回已解出的页面
    Cycle,
    /// 超出链长度上限
    ChainTooLong,
    /// 同一页面答错次数用尽
    Rejected,
}

/// 配置错误（致命，不重试）
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填项缺失
    #[error("缺少必填配置 {name}")]
    Missing { name: &'static str },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
    /// 取值不合法
    #[error("配置 {name} 不合法: {reason}")]
    Invalid { name: &'static str, reason: String },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 派发错误：请求被拒绝，链没有启动
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 同一 (email, url) 的链正在运行
    #[error("链 {key} 正在运行")]
    AlreadyRunning { key: String },
    /// 服务正在关闭
    #[error("服务正在关闭，不再接受新请求")]
    ShuttingDown,
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 浏览器启动 / 连接错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    /// HTTP 客户端构建错误
    #[error("HTTP客户端错误: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// 服务监听等 IO 错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器配置错误
    pub fn browser_config(reason: impl Into<String>) -> Self {
        AppError::Other(format!("浏览器配置失败: {}", reason.into()))
    }
}

impl AnswerError {
    /// 创建 LLM API 调用错误
    pub fn model_failed(model: impl Into<String>, source: async_openai::error::OpenAIError) -> Self {
        AnswerError::Model {
            model: model.into(),
            source,
        }
    }

    /// 创建数据集分析错误
    pub fn analysis(reason: impl Into<String>) -> Self {
        AnswerError::Analysis {
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_kind_follows_wrapped_error() {
        let fetch: StepError = FetchError::BadStatus {
            url: "https://quiz.test/a".into(),
            status: 502,
        }
        .into();
        assert_eq!(fetch.kind(), FailureKind::Fetch);

        let extraction: StepError = ExtractionError::EmptyPage {
            url: "https://quiz.test/a".into(),
        }
        .into();
        assert_eq!(extraction.kind(), FailureKind::Extraction);

        let answer: StepError = AnswerError::Empty { collaborator: "LLM" }.into();
        assert_eq!(answer.kind(), FailureKind::Answer);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::ChainTooLong).unwrap();
        assert_eq!(json, "\"chain_too_long\"");
    }
}
