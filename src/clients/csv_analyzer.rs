//! CSV 数据分析
//!
//! 题目形如"对 cutoff 以上的数值求和"。规则：
//! 1. 取第一列全为数值的列（首行是表头时跳过）
//! 2. 题目含 `cutoff N`：对大于 N 的值求和（题目说 below / less than 时取小于）
//! 3. 否则按关键词 count / mean / max / min 计算，默认求和

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::clients::DatasetAnalyzer;
use crate::error::AnswerError;
use crate::models::{AnswerValue, DatasetRef};

/// 基于 CSV 的数据集分析器
pub struct CsvAnalyzer {
    http: reqwest::Client,
}

impl CsvAnalyzer {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn load(&self, dataset: &DatasetRef) -> Result<String, AnswerError> {
        match dataset {
            DatasetRef::Inline(text) => Ok(text.clone()),
            DatasetRef::Url(url) => {
                info!("   → 下载 CSV: {}", url);
                let load_err = |reason: String| AnswerError::DatasetLoad {
                    source_ref: url.clone(),
                    reason,
                };
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| load_err(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(load_err(format!("HTTP {}", response.status())));
                }
                response.text().await.map_err(|e| load_err(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl DatasetAnalyzer for CsvAnalyzer {
    async fn analyze(&self, dataset: &DatasetRef, prompt: &str) -> Result<AnswerValue, AnswerError> {
        let text = self.load(dataset).await?;
        let rows = parse_csv(&text);
        debug!("   → CSV 共 {} 行", rows.len());
        analyze_rows(&rows, prompt)
    }
}

/// 解析 CSV 文本（支持双引号包裹的字段，引号内可含逗号和换行）
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut field).trim().to_string()),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field).trim().to_string());
                push_record(&mut rows, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    record.push(field.trim().to_string());
    push_record(&mut rows, record);
    rows
}

/// 空行不计入
fn push_record(rows: &mut Vec<Vec<String>>, record: Vec<String>) {
    if record.iter().any(|field| !field.is_empty()) {
        rows.push(record);
    }
}

/// 只接受有限数值（排除 NaN / inf）
fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 聚合方式
#[derive(Debug, Clone, Copy, PartialEq)]
enum Aggregate {
    SumAbove(f64),
    SumBelow(f64),
    Count,
    Mean,
    Max,
    Min,
    Sum,
}

fn aggregate_for(prompt: &str) -> Aggregate {
    let lower = prompt.to_lowercase();
    let cutoff = Regex::new(r"cutoff(?:\s+of)?[:\s]+(-?\d+(?:\.\d+)?)")
        .ok()
        .and_then(|re| re.captures(&lower))
        .and_then(|caps| caps[1].parse::<f64>().ok());

    if let Some(cutoff) = cutoff {
        if lower.contains("below") || lower.contains("less than") {
            return Aggregate::SumBelow(cutoff);
        }
        return Aggregate::SumAbove(cutoff);
    }

    if lower.contains("how many") || lower.contains("count") {
        Aggregate::Count
    } else if lower.contains("average") || lower.contains("mean") {
        Aggregate::Mean
    } else if lower.contains("maximum") || lower.contains("largest") || lower.contains("max ") {
        Aggregate::Max
    } else if lower.contains("minimum") || lower.contains("smallest") || lower.contains("min ") {
        Aggregate::Min
    } else {
        Aggregate::Sum
    }
}

/// 第一列全为数值的列
fn first_numeric_column(rows: &[Vec<String>]) -> Option<Vec<f64>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    (0..width).find_map(|col| {
        let cells: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(col))
            .map(String::as_str)
            .filter(|cell| !cell.is_empty())
            .collect();

        // 首行解析失败视为表头
        let body = match cells.split_first() {
            Some((head, rest)) if parse_finite(head).is_none() => rest,
            _ => &cells[..],
        };
        let values: Option<Vec<f64>> = body.iter().map(|cell| parse_finite(cell)).collect();
        values.filter(|v| !v.is_empty())
    })
}

/// 对已解析的行计算答案
pub fn analyze_rows(rows: &[Vec<String>], prompt: &str) -> Result<AnswerValue, AnswerError> {
    if rows.is_empty() {
        return Err(AnswerError::analysis("数据集为空"));
    }
    let values = first_numeric_column(rows).ok_or_else(|| AnswerError::analysis("没有数值列"))?;

    let aggregate = aggregate_for(prompt);
    debug!("   → 聚合方式: {:?}, 数值 {} 个", aggregate, values.len());

    let result = match aggregate {
        Aggregate::SumAbove(cutoff) => values.iter().filter(|v| **v > cutoff).sum(),
        Aggregate::SumBelow(cutoff) => values.iter().filter(|v| **v < cutoff).sum(),
        Aggregate::Count => values.len() as f64,
        Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
        Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregate::Sum => values.iter().sum(),
    };

    Ok(AnswerValue::from_f64(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(text: &str) -> Vec<Vec<String>> {
        parse_csv(text)
    }

    #[test]
    fn test_cutoff_sums_values_strictly_above() {
        let data = rows("5\n10\n15\n20\n");
        let answer = analyze_rows(&data, "Sum all numbers greater than the cutoff: 10").unwrap();
        assert_eq!(answer, AnswerValue::Integer(35));
    }

    #[test]
    fn test_cutoff_of_phrase_and_below() {
        let data = rows("5\n10\n15\n");
        let answer = analyze_rows(&data, "Add the values below the cutoff of 12").unwrap();
        assert_eq!(answer, AnswerValue::Integer(15));
    }

    #[test]
    fn test_header_row_is_skipped() {
        let data = rows("name,score\nann,3\nbob,4.5\n");
        let answer = analyze_rows(&data, "What is the total score?").unwrap();
        assert_eq!(answer, AnswerValue::Number(7.5));
    }

    #[test]
    fn test_keyword_aggregates() {
        let data = rows("n\n2\n4\n9\n");
        assert_eq!(analyze_rows(&data, "How many rows?").unwrap(), AnswerValue::Integer(3));
        assert_eq!(analyze_rows(&data, "average of n").unwrap(), AnswerValue::Integer(5));
        assert_eq!(analyze_rows(&data, "the largest n").unwrap(), AnswerValue::Integer(9));
        assert_eq!(analyze_rows(&data, "the smallest n").unwrap(), AnswerValue::Integer(2));
    }

    #[test]
    fn test_quoted_fields() {
        let data = rows("\"a, b\",\"1\"\n\"say \"\"hi\"\"\",2\n");
        assert_eq!(data[0], vec!["a, b".to_string(), "1".to_string()]);
        assert_eq!(data[1][0], "say \"hi\"");
        assert_eq!(analyze_rows(&data, "sum").unwrap(), AnswerValue::Integer(3));
    }

    #[test]
    fn test_quoted_field_spans_line_break() {
        let data = rows("name,score\r\n\"Ann\nLee\",5\r\nBob,7\n");
        assert_eq!(data.len(), 3);
        assert_eq!(data[1], vec!["Ann\nLee".to_string(), "5".to_string()]);
        assert_eq!(analyze_rows(&data, "total score").unwrap(), AnswerValue::Integer(12));
    }

    #[test]
    fn test_non_finite_cells_are_not_numeric() {
        let data = rows("a,b\nNaN,1\ninf,2\n");
        assert_eq!(analyze_rows(&data, "sum").unwrap(), AnswerValue::Integer(3));

        let only_nan = rows("x\nNaN\n");
        assert!(analyze_rows(&only_nan, "sum").is_err());
    }

    #[test]
    fn test_no_numeric_column_is_error() {
        let data = rows("a,b\nc,d\n");
        assert!(matches!(
            analyze_rows(&data, "sum"),
            Err(AnswerError::Analysis { .. })
        ));
    }

    #[tokio::test]
    async fn test_inline_dataset_needs_no_network() {
        let analyzer = CsvAnalyzer::new(Duration::from_secs(1)).unwrap();
        let dataset = DatasetRef::Inline("1\n2\n3".into());
        let answer = analyzer.analyze(&dataset, "cutoff: 1").await.unwrap();
        assert_eq!(answer, AnswerValue::Integer(5));
    }
}
