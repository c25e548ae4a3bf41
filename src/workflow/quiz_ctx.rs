//! 题目处理上下文
//!
//! 封装"我正在处理哪条链的第几题、第几次尝试"这一信息，只用于日志

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone)]
pub struct QuizCtx {
    /// 链 ID（日志里只显示前 8 位）
    pub chain_id: String,

    /// 题目序号（从1开始，按提交次数计）
    pub quiz_index: usize,

    /// 当前地址上的失败次数
    pub attempt: u32,
}

impl QuizCtx {
    /// 创建新的题目上下文
    pub fn new(chain_id: &str, quiz_index: usize, attempt: u32) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            quiz_index,
            attempt,
        }
    }

    fn short_id(&self) -> &str {
        match self.chain_id.char_indices().nth(8) {
            Some((idx, _)) => &self.chain_id[..idx],
            None => &self.chain_id,
        }
    }
}

impl Display for QuizCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.attempt == 0 {
            write!(f, "[链 {} 第{}题]", self.short_id(), self.quiz_index)
        } else {
            write!(
                f,
                "[链 {} 第{}题 重试#{}]",
                self.short_id(),
                self.quiz_index,
                self.attempt
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shortens_id_and_shows_retry() {
        let ctx = QuizCtx::new("0123456789abcdef", 2, 0);
        assert_eq!(ctx.to_string(), "[链 01234567 第2题]");

        let ctx = QuizCtx::new("abc", 1, 3);
        assert_eq!(ctx.to_string(), "[链 abc 第1题 重试#3]");
    }
}
