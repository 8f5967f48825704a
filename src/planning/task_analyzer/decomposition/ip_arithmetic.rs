use super::{contains_any, contains_ascii_word};

const SUM_TOKENS: &[&str] = &["求和", "计算", "sum", "compute", "calculate", "add up"];

pub(super) fn matches(input_lower: &str) -> bool {
    (contains_ascii_word(input_lower, "ip") || input_lower.contains("ip地址"))
        && contains_any(input_lower, SUM_TOKENS)
}

pub(crate) fn decompose_ip_arithmetic(_input: &str) -> Vec<String> {
    vec![
        "acquire current IP address".to_string(),
        "split IP address into segments".to_string(),
        "convert IP segments to numbers".to_string(),
        "sum IP segments".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_requires_ip_and_sum() {
        assert!(matches("把当前的ip地址进行求和，根据.进行分开"));
        assert!(matches("compute the sum of my ip"));
        assert!(!matches("根据字符串验证并且判断系统ip是什么"));
        assert!(!matches("sum the pipeline stages"));
    }
}
