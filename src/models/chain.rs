//! 链状态与终态记录

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, StepError};

/// 驱动器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Fetching,
    Extracting,
    Answering,
    Submitting,
    Retrying,
    Done,
    Failed,
}

impl ChainStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChainStatus::Done | ChainStatus::Failed)
    }
}

/// 历史事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub at: DateTime<Utc>,
    pub url: String,
    #[serde(flatten)]
    pub kind: ChainEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChainEventKind {
    /// 答对，进入下一题
    Accepted { next_url: String },
    /// 答错，转到指定页面
    Rejected {
        next_url: String,
        message: Option<String>,
    },
    /// 最后一题已提交
    Completed {
        accepted: bool,
        message: Option<String>,
    },
    /// 某一步失败（会重试或导致失败）
    StepFailed {
        error: FailureKind,
        message: String,
        attempt: u32,
    },
}

/// 链失败原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ChainFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "请求已取消")
    }
}

impl From<&StepError> for ChainFailure {
    fn from(err: &StepError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// 链状态：只由驱动器持有和修改
#[derive(Debug, Clone)]
pub struct ChainState {
    pub current_url: String,
    pub attempt_count: u32,
    pub solved_count: usize,
    /// 已提交次数（含答错）
    pub submissions: usize,
    pub status: ChainStatus,
    pub history: Vec<ChainEvent>,
    pub last_failure: Option<ChainFailure>,
    solved_urls: HashSet<String>,
}

impl ChainState {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            current_url: start_url.into(),
            attempt_count: 0,
            solved_count: 0,
            submissions: 0,
            status: ChainStatus::Fetching,
            history: Vec::new(),
            last_failure: None,
            solved_urls: HashSet::new(),
        }
    }

    /// 切换到新地址；地址变化时清零尝试次数
    pub fn advance_to(&mut self, next_url: &str) {
        if self.current_url != next_url {
            self.current_url = next_url.to_string();
            self.attempt_count = 0;
        }
    }

    /// 记一次失败，返回是否还能重试
    pub fn register_failure(&mut self, max_attempts: u32) -> bool {
        self.attempt_count += 1;
        self.attempt_count <= max_attempts
    }

    /// 当前页面答对
    pub fn mark_solved(&mut self) {
        self.solved_count += 1;
        self.solved_urls.insert(self.current_url.clone());
    }

    pub fn was_solved(&self, url: &str) -> bool {
        self.solved_urls.contains(url)
    }

    pub fn record(&mut self, kind: ChainEventKind) {
        self.history.push(ChainEvent {
            at: Utc::now(),
            url: self.current_url.clone(),
            kind,
        });
    }

    pub fn record_step_failure(&mut self, err: &StepError) {
        let failure = ChainFailure::from(err);
        self.record(ChainEventKind::StepFailed {
            error: failure.kind,
            message: failure.message.clone(),
            attempt: self.attempt_count,
        });
        self.last_failure = Some(failure);
    }
}

/// 链的终态记录，交给结果投递方
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOutcome {
    pub chain_id: String,
    pub email: String,
    pub start_url: String,
    pub status: ChainStatus,
    pub solved_count: usize,
    pub last_url: String,
    pub failure: Option<ChainFailure>,
    pub history: Vec<ChainEvent>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ChainOutcome {
    pub fn is_done(&self) -> bool {
        self.status == ChainStatus::Done
    }
}
