use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// 一次 `/solve` 请求
///
/// 每次 API 调用创建一次，之后只读。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub email: String,
    pub secret: String,
    /// 起始题目地址
    #[serde(rename = "url")]
    pub start_url: String,
}

impl SolveRequest {
    pub fn new(email: impl Into<String>, secret: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
            start_url: start_url.into(),
        }
    }

    /// 去重用的键：同一邮箱 + 同一起始地址同时只跑一条链
    pub fn key(&self) -> ChainKey {
        ChainKey {
            email: self.email.clone(),
            start_url: self.start_url.clone(),
        }
    }
}

/// 链的标识键 (email, start_url)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainKey {
    pub email: String,
    pub start_url: String,
}

impl Display for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.email, self.start_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_reads_url_field() {
        let req: SolveRequest = serde_json::from_str(
            r#"{"email":"a@b.c","secret":"s","url":"https://quiz.test/start"}"#,
        )
        .unwrap();
        assert_eq!(req.start_url, "https://quiz.test/start");
        assert_eq!(req.key().to_string(), "a@b.c @ https://quiz.test/start");
    }
}
