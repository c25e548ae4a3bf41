use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use quiz_chain_solver::clients::{BrowserPageFetcher, CsvAnalyzer, HttpSubmitter, LlmClient};
use quiz_chain_solver::orchestrator::run_reporter;
use quiz_chain_solver::services::QuestionExtractor;
use quiz_chain_solver::utils::logging;
use quiz_chain_solver::{
    create_router, AppState, ChainDispatcher, ChainDriver, Collaborators, Config, QuizFlow,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();

    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::load()?;
    let policy = config.chain_policy();
    logging::log_startup(&config.bind_addr, &config.llm_model_name, policy.max_attempts);

    // 准备协作方
    let fetcher = BrowserPageFetcher::start(&config).await?;
    info!("✓ 浏览器已就绪");

    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        model: Arc::new(LlmClient::new(&config)),
        analyzer: Arc::new(CsvAnalyzer::new(policy.answer_timeout)?),
        submitter: Arc::new(HttpSubmitter::new(policy.submit_timeout)?),
    };

    let flow = QuizFlow::new(
        &collaborators,
        QuestionExtractor::new(config.fallback_submit_url.clone()),
        policy,
        config.verbose_logging,
    );

    let (outcome_tx, outcome_rx) = tokio::sync::mpsc::unbounded_channel();
    let reporter = tokio::spawn(run_reporter(outcome_rx));

    let state = Arc::new(AppState {
        shared_secret: config.shared_secret.clone(),
        dispatcher: ChainDispatcher::new(ChainDriver::new(flow), outcome_tx),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("无法监听 {}", config.bind_addr))?;
    info!("🌐 服务已启动: http://{}", config.bind_addr);

    axum::serve(listener, create_router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 停止所有链，再等结果投递完
    state.dispatcher.shutdown().await;
    drop(state);
    let stats = reporter.await?;
    info!("👋 程序退出 (完成 {} / 失败 {})", stats.done, stats.failed);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
    }
    info!("🛑 收到退出信号，正在关闭...");
}
