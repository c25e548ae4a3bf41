//! 答案提交客户端
//!
//! 请求体：`{email, secret, url, answer}`
//! 响应体：`{correct, url?, reason?}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::Submitter;
use crate::error::SubmitError;
use crate::models::{AnswerValue, Submission, SubmitResult};
use crate::utils::urls::resolve;

/// 提交请求体
#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    email: &'a str,
    secret: &'a str,
    url: &'a str,
    answer: &'a AnswerValue,
}

impl<'a> From<&'a Submission> for SubmitPayload<'a> {
    fn from(submission: &'a Submission) -> Self {
        Self {
            email: &submission.email,
            secret: &submission.secret,
            url: &submission.quiz_url,
            answer: &submission.answer.value,
        }
    }
}

/// 提交响应体
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    correct: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// 基于 reqwest 的提交器
pub struct HttpSubmitter {
    http: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, submission: &Submission) -> Result<SubmitResult, SubmitError> {
        let endpoint = submission.submit_url.as_str();
        // 不记录 secret
        debug!(
            "📤 POST {} (quiz={}, answer={})",
            endpoint, submission.quiz_url, submission.answer.value
        );

        let response = self
            .http
            .post(endpoint)
            .json(&SubmitPayload::from(submission))
            .send()
            .await
            .map_err(|source| SubmitError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| SubmitError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(SubmitError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("提交响应: {}", body);
        interpret_response(endpoint, &body)
    }
}

/// 把响应体转换成 `SubmitResult`
///
/// 空的 `url` 视为没有下一题；相对地址按提交地址解析。
pub fn interpret_response(endpoint: &str, body: &str) -> Result<SubmitResult, SubmitError> {
    let malformed = |reason: String| SubmitError::Malformed {
        endpoint: endpoint.to_string(),
        reason,
    };

    let response: SubmitResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("{} (body: {})", e, body)))?;

    let next_url = match response.url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            resolve(endpoint, raw).map_err(|e| malformed(format!("下一题地址 {} 无效: {}", raw, e)))?,
        ),
    };

    Ok(SubmitResult {
        accepted: response.correct,
        terminal: next_url.is_none(),
        next_url,
        message: response.reason.filter(|r| !r.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, AnswerKind};

    const ENDPOINT: &str = "https://quiz.test/submit";

    #[test]
    fn test_correct_with_next_url() {
        let result = interpret_response(ENDPOINT, r#"{"correct":true,"url":"https://quiz.test/q2"}"#).unwrap();
        assert_eq!(result, SubmitResult::accepted("https://quiz.test/q2"));
    }

    #[test]
    fn test_missing_or_empty_url_is_terminal() {
        let result = interpret_response(ENDPOINT, r#"{"correct":true}"#).unwrap();
        assert!(result.terminal);
        assert!(result.accepted);

        let result = interpret_response(ENDPOINT, r#"{"correct":false,"url":"","reason":"wrong"}"#).unwrap();
        assert!(result.terminal);
        assert!(!result.accepted);
        assert_eq!(result.message.as_deref(), Some("wrong"));
    }

    #[test]
    fn test_relative_next_url_resolved_against_endpoint() {
        let result = interpret_response(ENDPOINT, r#"{"correct":false,"url":"/quiz/3","reason":"try again"}"#).unwrap();
        assert_eq!(result.next_url.as_deref(), Some("https://quiz.test/quiz/3"));
        assert!(!result.terminal);
    }

    #[test]
    fn test_unparseable_body_is_malformed() {
        let err = interpret_response(ENDPOINT, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, SubmitError::Malformed { .. }));

        let err = interpret_response(ENDPOINT, r#"{"url":"https://quiz.test/q2"}"#).unwrap_err();
        assert!(matches!(err, SubmitError::Malformed { .. }));
    }

    #[test]
    fn test_payload_shape() {
        let submission = Submission {
            submit_url: ENDPOINT.into(),
            quiz_url: "https://quiz.test/q1".into(),
            email: "a@b.c".into(),
            secret: "s".into(),
            answer: Answer::new(AnswerValue::Integer(42), AnswerKind::DatasetDerived),
        };
        let json = serde_json::to_value(SubmitPayload::from(&submission)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email":"a@b.c","secret":"s","url":"https://quiz.test/q1","answer":42})
        );
    }
}
