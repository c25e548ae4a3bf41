use url::Url;

/// 把可能是相对地址的 `raw` 按 `base` 解析成绝对地址
pub fn resolve(base: &str, raw: &str) -> Result<String, url::ParseError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(base)?.join(raw)?.to_string()),
        Err(e) => Err(e),
    }
}

/// 规范化绝对地址（如补全根路径 `/`）；无法解析时原样返回
pub fn normalize(raw: &str) -> String {
    Url::parse(raw)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.to_string())
}
