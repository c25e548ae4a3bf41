//! 结果投递
//!
//! 从完成 channel 读取每条链的终态记录，用日志输出摘要。

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::models::ChainOutcome;
use crate::utils::logging::log_chain_outcome;

/// 汇总统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportStats {
    pub done: usize,
    pub failed: usize,
    pub solved: usize,
}

/// 持续接收结果，直到所有发送方关闭
pub async fn run_reporter(mut outcomes: UnboundedReceiver<ChainOutcome>) -> ReportStats {
    let mut stats = ReportStats::default();

    while let Some(outcome) = outcomes.recv().await {
        log_chain_outcome(&outcome);
        if outcome.is_done() {
            stats.done += 1;
        } else {
            stats.failed += 1;
        }
        stats.solved += outcome.solved_count;
    }

    info!(
        "📊 共完成 {} 条链，失败 {} 条，累计答对 {} 题",
        stats.done, stats.failed, stats.solved
    );
    stats
}
