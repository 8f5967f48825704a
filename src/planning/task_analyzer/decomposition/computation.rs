use super::contains_any;

const COMPUTE_TOKENS: &[&str] = &["计算", "compute", "calculate"];

pub(super) fn matches(input_lower: &str) -> bool {
    contains_any(input_lower, COMPUTE_TOKENS)
}

pub(crate) fn decompose_computation(_input: &str) -> Vec<String> {
    vec![
        "parse computation requirement".to_string(),
        "perform numeric computation".to_string(),
        "return computation result".to_string(),
    ]
}
