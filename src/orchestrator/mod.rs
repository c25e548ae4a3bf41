//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责链的调度和状态推进，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `dispatcher` - 链派发器
//! - 每个请求一个 tokio 任务
//! - 同一 (email, url) 同时只跑一条链
//! - 持有根取消信号，关闭时等待所有链结束
//!
//! ### `chain_driver` - 链驱动器
//! - 持有单条链的状态（当前地址、失败次数、答对题数）
//! - 执行重试、跳转、终止规则
//!
//! ### `reporter` - 结果投递
//! - 接收终态记录并输出摘要
//!
//! ## 层次关系
//!
//! ```text
//! dispatcher (处理多条链)
//!     ↓
//! chain_driver (处理一条链)
//!     ↓
//! workflow::QuizFlow (处理单步)
//!     ↓
//! services (能力层：extract / answer)
//!     ↓
//! clients (协作方：browser / llm / csv / submit)
//! ```

pub mod chain_driver;
pub mod dispatcher;
pub mod reporter;

// 重新导出主要类型
pub use chain_driver::ChainDriver;
pub use dispatcher::ChainDispatcher;
pub use reporter::{run_reporter, ReportStats};
