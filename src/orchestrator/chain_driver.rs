//! 链驱动器 - 编排层
//!
//! ## 职责
//!
//! 把"抓取 → 解析 → 作答 → 提交 → 跳转"串成一个循环，并执行重试与终止规则。
//! 它是唯一持有跨轮状态（当前地址、失败次数、已答对题数）的模块。
//!
//! ## 状态转换
//!
//! - 任意一步失败 → 当前地址失败次数 +1；未超过 `max_attempts` 时等待后
//!   原样重试失败的那一步（页面 / 题目 / 答案保持不变），否则链失败
//! - 提交返回终点 → 完成（答对题数 +1）
//! - 提交答对且有下一题 → 跳转（答对题数 +1，失败次数清零）
//! - 提交答错且有下一题 → 跳转（不计入答对）
//! - 答错且下一题就是当前页 → 原地重做，消耗一次失败次数
//!
//! 另外：下一题指回已答对的页面视为循环；提交次数达到 `max_chain_length` 时停止。

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ChainPolicy;
use crate::error::FailureKind;
use crate::models::{
    Answer, ChainEventKind, ChainFailure, ChainOutcome, ChainState, ChainStatus, QuestionDescription,
    QuizPage, SolveRequest, SubmitResult,
};
use crate::utils::logging::log_chain_start;
use crate::utils::urls::normalize;
use crate::workflow::{QuizCtx, QuizFlow, StepFailure};

/// 当前要执行的步骤，携带这一步的输入
enum Stage {
    Fetch,
    Extract(QuizPage),
    Answer(QuestionDescription),
    Submit(QuestionDescription, Answer),
}

/// 提交之后的去向
enum Next {
    Done,
    Fetch,
}

/// 链驱动器
///
/// 不持有可变状态，可在多个链之间共享。
pub struct ChainDriver {
    flow: QuizFlow,
}

impl ChainDriver {
    pub fn new(flow: QuizFlow) -> Self {
        Self { flow }
    }

    /// 跑完一条链，总是返回终态记录
    ///
    /// # 参数
    /// - `chain_id`: 链 ID
    /// - `request`: 求解请求
    /// - `cancel`: 取消信号
    pub async fn run(
        &self,
        chain_id: &str,
        request: &SolveRequest,
        cancel: &CancellationToken,
    ) -> ChainOutcome {
        let started_at = Utc::now();
        log_chain_start(chain_id, &request.email, &request.start_url);

        // 与提交结果中的地址采用同一规范形式
        let mut state = ChainState::new(normalize(&request.start_url));
        let failure = match self.drive(chain_id, request, &mut state, cancel).await {
            Ok(()) => {
                state.status = ChainStatus::Done;
                None
            }
            Err(failure) => {
                state.status = ChainStatus::Failed;
                state.last_failure = Some(failure.clone());
                Some(failure)
            }
        };

        ChainOutcome {
            chain_id: chain_id.to_string(),
            email: request.email.clone(),
            start_url: request.start_url.clone(),
            status: state.status,
            solved_count: state.solved_count,
            last_url: state.current_url,
            failure,
            history: state.history,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(
        &self,
        chain_id: &str,
        request: &SolveRequest,
        state: &mut ChainState,
        cancel: &CancellationToken,
    ) -> Result<(), ChainFailure> {
        let policy = self.flow.policy();
        let mut stage = Stage::Fetch;

        loop {
            if cancel.is_cancelled() {
                warn!("[链 {}] ⚠️ 收到取消信号，停止求解", chain_id);
                return Err(ChainFailure::cancelled());
            }

            let ctx = QuizCtx::new(chain_id, state.submissions + 1, state.attempt_count);

            let step = match &stage {
                Stage::Fetch => {
                    state.status = ChainStatus::Fetching;
                    let url = state.current_url.clone();
                    self.flow.fetch(&url, &ctx, cancel).await.map(Stage::Extract)
                }
                Stage::Extract(page) => {
                    state.status = ChainStatus::Extracting;
                    self.flow.extract(page, &ctx).map(Stage::Answer)
                }
                Stage::Answer(question) => {
                    state.status = ChainStatus::Answering;
                    self.flow
                        .answer(question, &ctx, cancel)
                        .await
                        .map(|answer| Stage::Submit(question.clone(), answer))
                }
                Stage::Submit(question, answer) => {
                    state.status = ChainStatus::Submitting;
                    match self.flow.submit(request, question, answer, &ctx, cancel).await {
                        Ok(result) => {
                            state.submissions += 1;
                            match self.follow(state, result, &ctx, policy)? {
                                Next::Done => return Ok(()),
                                Next::Fetch => {
                                    if state.attempt_count > 0 {
                                        self.pause(cancel).await?;
                                    }
                                    Ok(Stage::Fetch)
                                }
                            }
                        }
                        Err(failure) => Err(failure),
                    }
                }
            };

            match step {
                Ok(next_stage) => stage = next_stage,
                Err(StepFailure::Cancelled) => {
                    warn!("{} ⚠️ 步骤被取消", ctx);
                    return Err(ChainFailure::cancelled());
                }
                Err(StepFailure::Step(err)) => {
                    state.status = ChainStatus::Retrying;
                    let can_retry = state.register_failure(policy.max_attempts);
                    state.record_step_failure(&err);

                    if !can_retry {
                        error!(
                            "{} ❌ {} 已失败 {} 次，放弃: {}",
                            ctx, state.current_url, state.attempt_count, err
                        );
                        return Err(ChainFailure::from(&err));
                    }

                    warn!(
                        "{} ⚠️ 第 {}/{} 次失败，稍后重试: {}",
                        ctx, state.attempt_count, policy.max_attempts, err
                    );
                    self.pause(cancel).await?;
                }
            }
        }
    }

    /// 处理提交结果，更新链状态
    fn follow(
        &self,
        state: &mut ChainState,
        result: SubmitResult,
        ctx: &QuizCtx,
        policy: &ChainPolicy,
    ) -> Result<Next, ChainFailure> {
        let next_url = match result.next_url {
            Some(next_url) if !result.terminal => next_url,
            _ => {
                state.mark_solved();
                state.record(ChainEventKind::Completed {
                    accepted: result.accepted,
                    message: result.message,
                });
                info!("{} 🎉 已到达最后一题，共答对 {} 题", ctx, state.solved_count);
                return Ok(Next::Done);
            }
        };

        if result.accepted {
            state.mark_solved();
            state.record(ChainEventKind::Accepted {
                next_url: next_url.clone(),
            });
        } else {
            state.record(ChainEventKind::Rejected {
                next_url: next_url.clone(),
                message: result.message.clone(),
            });

            if next_url == state.current_url {
                if !state.register_failure(policy.max_attempts) {
                    error!("{} ❌ 同一题答错次数用尽", ctx);
                    return Err(ChainFailure::new(
                        FailureKind::Rejected,
                        result.message.unwrap_or_else(|| "答案被拒绝".to_string()),
                    ));
                }
                info!(
                    "{} 🔁 答错，原地重做 ({}/{})",
                    ctx, state.attempt_count, policy.max_attempts
                );
            }
        }

        if state.was_solved(&next_url) {
            error!("{} ❌ 下一题 {} 已经答对过，链出现循环", ctx, next_url);
            return Err(ChainFailure::new(
                FailureKind::Cycle,
                format!("下一题地址 {} 已经答对过", next_url),
            ));
        }

        if state.submissions >= policy.max_chain_length {
            error!("{} ❌ 提交次数达到上限 {}", ctx, policy.max_chain_length);
            return Err(ChainFailure::new(
                FailureKind::ChainTooLong,
                format!("提交次数达到上限 {}", policy.max_chain_length),
            ));
        }

        info!("{} ➡️ 下一题: {}", ctx, next_url);
        state.advance_to(&next_url);
        Ok(Next::Fetch)
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<(), ChainFailure> {
        self.flow
            .wait_before_retry(cancel)
            .await
            .map_err(|_| ChainFailure::cancelled())
    }
}
