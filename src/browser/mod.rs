pub mod connection;
pub mod headless;

use chromiumoxide::Browser;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::AppResult;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

/// 按配置准备浏览器：有调试端口就连接，否则启动无头浏览器
pub async fn start_browser(config: &Config) -> AppResult<(Browser, JoinHandle<()>)> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_headless_browser(config).await,
    }
}
