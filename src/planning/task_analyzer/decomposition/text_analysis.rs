use super::{contains_any, contains_ascii_word};

const TEXT_TOKENS: &[&str] = &["文本"];
const ANALYZE_TOKENS: &[&str] = &["分析", "analy"];
const STATISTICS_TOKENS: &[&str] = &["统计", "count", "statistic"];
const TRANSFORM_TOKENS: &[&str] = &["转换", "大写", "小写", "uppercase", "lowercase", "convert", "transform"];
const KEYWORD_TOKENS: &[&str] = &["关键词", "keyword"];

pub(super) fn matches(input_lower: &str) -> bool {
    (contains_any(input_lower, TEXT_TOKENS) || contains_ascii_word(input_lower, "text"))
        && contains_any(input_lower, ANALYZE_TOKENS)
}

pub(crate) fn decompose_text_analysis(input: &str) -> Vec<String> {
    let mut steps = vec!["read text content".to_string()];

    if contains_any(input, STATISTICS_TOKENS) {
        steps.push("count text features".to_string());
    }
    if contains_any(input, TRANSFORM_TOKENS) {
        steps.push("perform text transformation".to_string());
    }
    if contains_any(input, KEYWORD_TOKENS) {
        steps.push("extract keywords".to_string());
    }

    steps.push("consolidate analysis results".to_string());
    steps
}
