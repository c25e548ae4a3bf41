//! JS 执行器 - 基础设施层
//!
//! 持有一个标签页，只暴露"导航 / 执行 JS / 关闭"能力

use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;

/// JS 执行器
///
/// 职责：
/// - 独占一个 Page（一次抓取一个标签页）
/// - 不认识题目 / 链
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 导航并等待加载完成
    pub async fn goto(&self, url: &str) -> Result<(), CdpError> {
        self.page.goto(url).await?;
        Ok(())
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T, CdpError> {
        let result = self.page.evaluate(js_code.into()).await?;
        Ok(result.into_value()?)
    }

    /// 关闭标签页
    pub async fn close(self) -> Result<(), CdpError> {
        self.page.close().await
    }
}
