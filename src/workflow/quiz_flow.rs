//! 题目处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的每一步怎么执行
//!
//! 流程顺序：
//! 1. fetch → 渲染页面
//! 2. extract → 解析题目
//! 3. answer → 选择策略作答
//! 4. submit → 提交答案
//!
//! 每一步都带超时，并且和取消信号赛跑；重试与跳转由链驱动器决定。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clients::{Collaborators, PageFetcher, Submitter};
use crate::config::ChainPolicy;
use crate::error::{AnswerError, FetchError, StepError, SubmitError};
use crate::models::{Answer, QuestionDescription, QuizPage, SolveRequest, Submission, SubmitResult};
use crate::services::{AnswerSelector, QuestionExtractor};
use crate::utils::truncate_text;
use crate::workflow::quiz_ctx::QuizCtx;

/// 单步失败
#[derive(Debug)]
pub enum StepFailure {
    /// 可重试的步骤错误
    Step(StepError),
    /// 收到取消信号
    Cancelled,
}

impl From<StepError> for StepFailure {
    fn from(err: StepError) -> Self {
        StepFailure::Step(err)
    }
}

/// 题目处理流程
///
/// - 只负责单步执行，不持有链状态
/// - 只依赖协作方接口和业务能力（services）
pub struct QuizFlow {
    fetcher: Arc<dyn PageFetcher>,
    submitter: Arc<dyn Submitter>,
    extractor: QuestionExtractor,
    selector: AnswerSelector,
    policy: ChainPolicy,
    verbose_logging: bool,
}

impl QuizFlow {
    pub fn new(
        collaborators: &Collaborators,
        extractor: QuestionExtractor,
        policy: ChainPolicy,
        verbose_logging: bool,
    ) -> Self {
        Self {
            fetcher: Arc::clone(&collaborators.fetcher),
            submitter: Arc::clone(&collaborators.submitter),
            extractor,
            selector: AnswerSelector::new(collaborators),
            policy,
            verbose_logging,
        }
    }

    pub fn policy(&self) -> &ChainPolicy {
        &self.policy
    }

    /// 抓取页面
    pub async fn fetch(
        &self,
        url: &str,
        ctx: &QuizCtx,
        cancel: &CancellationToken,
    ) -> Result<QuizPage, StepFailure> {
        info!("{} 🌐 正在抓取页面: {}", ctx, url);
        let after = self.policy.fetch_timeout;
        let page = guarded(cancel, after, self.fetcher.fetch(url), || FetchError::Timeout {
            url: url.to_string(),
            after,
        })
        .await?;

        if self.verbose_logging {
            info!("{} 页面内容: {}", ctx, truncate_text(&page.raw_content, 300));
        }
        Ok(page)
    }

    /// 解析题目
    pub fn extract(&self, page: &QuizPage, ctx: &QuizCtx) -> Result<QuestionDescription, StepFailure> {
        let question = self.extractor.extract(page).map_err(StepError::from)?;
        info!(
            "{} ✓ 题目解析完成 (类型: {:?}, 提交地址: {})",
            ctx, question.answer_kind, question.submit_url
        );
        debug!("{} 题干: {}", ctx, truncate_text(&question.prompt_text, 100));
        Ok(question)
    }

    /// 作答
    pub async fn answer(
        &self,
        question: &QuestionDescription,
        ctx: &QuizCtx,
        cancel: &CancellationToken,
    ) -> Result<Answer, StepFailure> {
        let after = self.policy.answer_timeout;
        let answer = guarded(
            cancel,
            after,
            self.selector.select_and_answer(question),
            || AnswerError::Timeout { after },
        )
        .await?;

        info!("{} ✓ 答案: {}", ctx, truncate_text(&answer.value.to_string(), 100));
        Ok(answer)
    }

    /// 提交答案
    ///
    /// 既没有下一题也不是终点的响应按格式错误处理。
    pub async fn submit(
        &self,
        request: &SolveRequest,
        question: &QuestionDescription,
        answer: &Answer,
        ctx: &QuizCtx,
        cancel: &CancellationToken,
    ) -> Result<SubmitResult, StepFailure> {
        let submission = Submission {
            submit_url: question.submit_url.clone(),
            quiz_url: question.quiz_url.clone(),
            email: request.email.clone(),
            secret: request.secret.clone(),
            answer: answer.clone(),
        };

        info!("{} 📤 正在提交答案到: {}", ctx, submission.submit_url);
        let after = self.policy.submit_timeout;
        let result = guarded(cancel, after, self.submitter.submit(&submission), || {
            SubmitError::Timeout {
                endpoint: submission.submit_url.clone(),
                after,
            }
        })
        .await?;

        if result.next_url.is_none() && !result.terminal {
            return Err(StepFailure::Step(
                SubmitError::Malformed {
                    endpoint: submission.submit_url,
                    reason: "响应既没有下一题地址也不是终点".to_string(),
                }
                .into(),
            ));
        }

        if result.accepted {
            info!("{} ✓ 回答正确", ctx);
        } else {
            warn!(
                "{} ⚠️ 回答错误: {}",
                ctx,
                result.message.as_deref().unwrap_or("无说明")
            );
        }
        Ok(result)
    }

    /// 重试前等待，可被取消
    pub async fn wait_before_retry(&self, cancel: &CancellationToken) -> Result<(), StepFailure> {
        if self.policy.retry_delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StepFailure::Cancelled),
            _ = tokio::time::sleep(self.policy.retry_delay) => Ok(()),
        }
    }
}

/// 带超时执行一步，并与取消信号赛跑（取消优先）
async fn guarded<T, E, F, G>(
    cancel: &CancellationToken,
    after: Duration,
    step: F,
    on_timeout: G,
) -> Result<T, StepFailure>
where
    F: Future<Output = Result<T, E>>,
    G: FnOnce() -> E,
    E: Into<StepError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StepFailure::Cancelled),
        outcome = tokio::time::timeout(after, step) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(StepFailure::Step(err.into())),
            Err(_) => Err(StepFailure::Step(on_timeout().into())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn test_guarded_times_out_into_step_error() {
        let cancel = CancellationToken::new();
        let after = Duration::from_millis(10);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, FetchError>(())
        };
        let result = guarded(&cancel, after, slow, || FetchError::Timeout {
            url: "u".into(),
            after,
        })
        .await;
        match result {
            Err(StepFailure::Step(err)) => assert_eq!(err.kind(), FailureKind::Fetch),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_guarded_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ready = async { Ok::<_, AnswerError>(1) };
        let result = guarded(&cancel, Duration::from_secs(1), ready, || AnswerError::Timeout {
            after: Duration::from_secs(1),
        })
        .await;
        assert!(matches!(result, Err(StepFailure::Cancelled)));
    }
}
