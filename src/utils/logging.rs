/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::models::ChainOutcome;

/// 未设置 `RUST_LOG` 时的默认过滤规则
pub const DEFAULT_FILTER: &str = "quiz_chain_solver=info,tower_http=info";

/// 初始化全局日志订阅器
///
/// 重复调用时静默忽略（测试里会多次初始化）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `bind_addr`: 监听地址
/// - `model_name`: LLM 模型名称
/// - `max_attempts`: 每个地址的最大失败次数
pub fn log_startup(bind_addr: &str, model_name: &str, max_attempts: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目链自动求解服务");
    info!("🌐 监听地址: {}", bind_addr);
    info!("🤖 LLM 模型: {}", model_name);
    info!("🔁 每题最多失败: {} 次", max_attempts);
    info!("{}", "=".repeat(60));
}

/// 记录一条链的开始
pub fn log_chain_start(chain_id: &str, email: &str, start_url: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始求解链 {}", chain_id);
    info!("📧 邮箱: {}", email);
    info!("🔗 起始地址: {}", start_url);
    info!("{}", "=".repeat(60));
}

/// 打印一条链的最终结果
pub fn log_chain_outcome(outcome: &ChainOutcome) {
    let elapsed = outcome.finished_at - outcome.started_at;

    info!("\n{}", "=".repeat(60));
    info!("📊 链 {} 结束", outcome.chain_id);
    info!("完成时间: {}", outcome.finished_at.format("%Y-%m-%d %H:%M:%S"));
    info!("耗时: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    info!("{}", "=".repeat(60));
    if outcome.is_done() {
        info!("✅ 状态: 完成");
    } else {
        info!("❌ 状态: 失败");
    }
    info!("✓ 答对题数: {}", outcome.solved_count);
    info!("🔗 最后地址: {}", outcome.last_url);
    if let Some(failure) = &outcome.failure {
        info!("⚠️ 失败原因 ({:?}): {}", failure.kind, failure.message);
    }
    info!("📝 事件数: {}", outcome.history.len());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
