use super::{contains_any, contains_ascii_word};

const TIME_TOKENS: &[&str] = &["时间"];
const FORMAT_TOKENS: &[&str] = &["格式化", "format"];

pub(super) fn matches(input_lower: &str) -> bool {
    contains_any(input_lower, TIME_TOKENS) || contains_ascii_word(input_lower, "time")
}

pub(crate) fn decompose_time_query(input: &str) -> Vec<String> {
    let mut steps = vec!["fetch system time".to_string()];
    if contains_any(input, FORMAT_TOKENS) {
        steps.push("format time display".to_string());
    }
    steps
}
