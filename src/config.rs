use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_VAR: &str = "QUIZ_SOLVER_CONFIG";
/// 默认配置文件（存在时才读取）
pub const DEFAULT_CONFIG_PATH: &str = "quiz_solver.toml";

/// 程序配置
///
/// 加载顺序：默认值 → TOML 文件 → 环境变量，最后 `validate()`。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务监听地址
    pub bind_addr: String,
    /// `/solve` 请求必须携带的共享密钥
    pub shared_secret: String,
    /// 是否显示详细日志（页面文本预览等）
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 链策略 ---
    /// 同一 URL 上允许的失败次数
    pub max_attempts: u32,
    /// 单条链最多提交次数
    pub max_chain_length: usize,
    pub fetch_timeout_secs: u64,
    pub answer_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    /// 两次重试之间的等待
    pub retry_delay_ms: u64,
    // --- 浏览器配置 ---
    /// 页面加载后等待脚本渲染的时间
    pub settle_delay_ms: u64,
    /// 设置后连接已有浏览器的调试端口，而不是启动新的无头浏览器
    pub browser_debug_port: Option<u16>,
    pub chrome_executable: Option<String>,
    /// 页面上找不到提交地址时使用
    pub fallback_submit_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            shared_secret: String::new(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            max_attempts: 3,
            max_chain_length: 25,
            fetch_timeout_secs: 60,
            answer_timeout_secs: 60,
            submit_timeout_secs: 60,
            retry_delay_ms: 1000,
            settle_delay_ms: 2000,
            browser_debug_port: None,
            chrome_executable: None,
            fallback_submit_url: None,
        }
    }
}

impl Config {
    /// 完整加载：TOML 文件（可选）+ 环境变量，并校验
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        let base = match path.as_deref() {
            Some(path) => Self::from_toml_file(Path::new(path))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        let config = base.with_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 TOML 配置文件
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 用环境变量覆盖已有取值
    ///
    /// `lookup` 抽出来便于测试，不必修改进程环境。
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = text("MY_SECRET") {
            self.shared_secret = v;
        }
        if let Some(v) = text("LLM_API_KEY").or_else(|| text("GEMINI_API_KEY")) {
            self.llm_api_key = v;
        }
        if let Some(v) = text("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = text("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = text("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = text("FALLBACK_SUBMIT_URL") {
            self.fallback_submit_url = Some(v);
        }

        parse_into(&text, "VERBOSE_LOGGING", "bool", &mut self.verbose_logging)?;
        parse_into(&text, "MAX_ATTEMPTS", "u32", &mut self.max_attempts)?;
        parse_into(&text, "MAX_CHAIN_LENGTH", "usize", &mut self.max_chain_length)?;
        parse_into(&text, "FETCH_TIMEOUT_SECS", "u64", &mut self.fetch_timeout_secs)?;
        parse_into(&text, "ANSWER_TIMEOUT_SECS", "u64", &mut self.answer_timeout_secs)?;
        parse_into(&text, "SUBMIT_TIMEOUT_SECS", "u64", &mut self.submit_timeout_secs)?;
        parse_into(&text, "RETRY_DELAY_MS", "u64", &mut self.retry_delay_ms)?;
        parse_into(&text, "SETTLE_DELAY_MS", "u64", &mut self.settle_delay_ms)?;

        if let Some(raw) = text("BROWSER_DEBUG_PORT") {
            self.browser_debug_port = Some(parse_value(&raw, "BROWSER_DEBUG_PORT", "u16")?);
        }

        Ok(self)
    }

    /// 校验致命配置项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared_secret.trim().is_empty() {
            return Err(ConfigError::Missing { name: "MY_SECRET" });
        }
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::Missing { name: "LLM_API_KEY" });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_ATTEMPTS",
                reason: "必须大于 0".to_string(),
            });
        }
        if self.max_chain_length == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_CHAIN_LENGTH",
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 链驱动器使用的策略
    pub fn chain_policy(&self) -> ChainPolicy {
        ChainPolicy {
            max_attempts: self.max_attempts,
            max_chain_length: self.max_chain_length,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            answer_timeout: Duration::from_secs(self.answer_timeout_secs),
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// 链驱动器的重试与终止策略
#[derive(Clone, Debug)]
pub struct ChainPolicy {
    pub max_attempts: u32,
    pub max_chain_length: usize,
    pub fetch_timeout: Duration,
    pub answer_timeout: Duration,
    pub submit_timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Config::default().chain_policy()
    }
}

fn parse_into<T, F>(
    text: &F,
    var_name: &str,
    expected_type: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = text(var_name) {
        *slot = parse_value(&raw, var_name, expected_type)?;
    }
    Ok(())
}

fn parse_value<T: FromStr>(raw: &str, var_name: &str, expected_type: &'static str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: raw.to_string(),
            expected_type,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = Config::default()
            .with_env_overrides(env(&[
                ("MY_SECRET", "s3cret"),
                ("GEMINI_API_KEY", "key-1"),
                ("MAX_ATTEMPTS", "5"),
                ("BROWSER_DEBUG_PORT", "9222"),
            ]))
            .unwrap();

        assert_eq!(config.shared_secret, "s3cret");
        assert_eq!(config.llm_api_key, "key-1");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.browser_debug_port, Some(9222));
        assert_eq!(config.fetch_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_api_key_wins_over_gemini_key() {
        let config = Config::default()
            .with_env_overrides(env(&[("LLM_API_KEY", "primary"), ("GEMINI_API_KEY", "fallback")]))
            .unwrap();
        assert_eq!(config.llm_api_key, "primary");
    }

    #[test]
    fn test_unparseable_number_is_config_error() {
        let err = Config::default()
            .with_env_overrides(env(&[("MAX_ATTEMPTS", "three")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarParseFailed { ref var_name, .. } if var_name == "MAX_ATTEMPTS"));
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let config = Config::default()
            .with_env_overrides(env(&[("LLM_API_KEY", "k")]))
            .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Missing { name: "MY_SECRET" })));
    }

    #[test]
    fn test_toml_values_are_layered_under_env() {
        let from_file: Config = toml::from_str(
            r#"
            shared_secret = "from-file"
            llm_api_key = "file-key"
            max_chain_length = 7
            "#,
        )
        .unwrap();
        let config = from_file
            .with_env_overrides(env(&[("MY_SECRET", "from-env")]))
            .unwrap();

        assert_eq!(config.shared_secret, "from-env");
        assert_eq!(config.llm_api_key, "file-key");
        assert_eq!(config.max_chain_length, 7);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_chain_policy_converts_units() {
        let config = Config {
            retry_delay_ms: 250,
            submit_timeout_secs: 9,
            ..Config::default()
        };
        let policy = config.chain_policy();
        assert_eq!(policy.retry_delay, Duration::from_millis(250));
        assert_eq!(policy.submit_timeout, Duration::from_secs(9));
    }
}
