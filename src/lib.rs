//! # Quiz Chain Solver
//!
//! 一个自动求解链式题目的 Rust 服务：收到起始地址后，逐页抓取题目、
//! 作答、提交，并沿着返回的下一题地址一直做下去
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动或连接浏览器
//! - `infrastructure/` - `JsExecutor`，标签页的唯一持有者，提供 goto / eval 能力
//!
//! ### ② 协作方（Clients）
//! - `clients/` - 链驱动器依赖的四个接口及其实现
//! - `BrowserPageFetcher` / `LlmClient` / `CsvAnalyzer` / `HttpSubmitter`
//!
//! ### ③ 业务能力层（Services）
//! - `QuestionExtractor` - 从页面解析题目
//! - `AnswerSelector` - 选择作答方式（数据分析 / 抓取 / LLM）
//!
//! ### ④ 流程层（Workflow）
//! - `QuizCtx` - 上下文封装（chain_id + 题号 + 重试次数）
//! - `QuizFlow` - 单步执行（fetch → extract → answer → submit），带超时和取消
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/chain_driver` - 链状态机，重试与终止规则
//! - `orchestrator/dispatcher` - 每个请求一个后台任务
//! - `orchestrator/reporter` - 终态记录投递
//!
//! ### ⑥ 接口层（Server）
//! - `server/` - axum 路由：`GET /`、`POST /solve`
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::Collaborators;
pub use config::{ChainPolicy, Config};
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{ChainOutcome, SolveRequest};
pub use orchestrator::{ChainDispatcher, ChainDriver};
pub use server::{create_router, AppState};
pub use workflow::{QuizCtx, QuizFlow};
