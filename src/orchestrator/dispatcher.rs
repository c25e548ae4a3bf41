//! 链派发器
//!
//! 每个被接受的请求在独立的 tokio 任务里跑一条链。派发器持有根取消信号，
//! 用 `TaskTracker` 跟踪所有任务，终态记录通过 channel 交给结果投递方。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::{ChainKey, ChainOutcome, SolveRequest};
use crate::orchestrator::chain_driver::ChainDriver;

type ActiveSet = Arc<Mutex<HashSet<ChainKey>>>;

/// 链派发器
pub struct ChainDispatcher {
    driver: Arc<ChainDriver>,
    outcomes: UnboundedSender<ChainOutcome>,
    root: CancellationToken,
    tracker: TaskTracker,
    active: ActiveSet,
}

impl ChainDispatcher {
    pub fn new(driver: ChainDriver, outcomes: UnboundedSender<ChainOutcome>) -> Self {
        Self {
            driver: Arc::new(driver),
            outcomes,
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 启动一条链，立即返回链 ID
    ///
    /// # 返回
    /// 同一 (email, url) 的链仍在运行时返回 `DispatchError::AlreadyRunning`
    pub fn dispatch(&self, request: SolveRequest) -> Result<String, DispatchError> {
        if self.root.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }

        let key = request.key();
        let guard = ActiveGuard::claim(&self.active, key.clone())
            .ok_or_else(|| DispatchError::AlreadyRunning { key: key.to_string() })?;

        let chain_id = Uuid::new_v4().to_string();
        let token = self.root.child_token();
        let driver = Arc::clone(&self.driver);
        let outcomes = self.outcomes.clone();
        let id = chain_id.clone();

        self.tracker.spawn(async move {
            let outcome = driver.run(&id, &request, &token).await;
            // 先释放键，再投递结果
            drop(guard);
            if outcomes.send(outcome).is_err() {
                warn!("[链 {}] ⚠️ 结果接收方已关闭，结果丢弃", id);
            }
        });

        info!("✓ 已接受请求 {}，链 ID: {}", key, chain_id);
        Ok(chain_id)
    }

    /// 正在运行的链数量
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// 取消所有链并等待它们交出终态记录
    pub async fn shutdown(&self) {
        info!("🛑 正在停止 {} 条运行中的链...", self.active_count());
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("✓ 所有链已停止");
    }
}

/// 活动键的占用凭据，drop 时释放
struct ActiveGuard {
    active: ActiveSet,
    key: ChainKey,
}

impl ActiveGuard {
    fn claim(active: &ActiveSet, key: ChainKey) -> Option<Self> {
        let inserted = active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then(|| Self {
            active: Arc::clone(active),
            key,
        })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
