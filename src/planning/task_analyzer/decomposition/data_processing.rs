use super::{contains_any, contains_ascii_word};

const DATA_TOKENS: &[&str] = &["数据"];
const ACTION_TOKENS: &[&str] = &["分析", "处理", "analy", "process"];

pub(super) fn matches(input_lower: &str) -> bool {
    (contains_any(input_lower, DATA_TOKENS) || contains_ascii_word(input_lower, "data"))
        && contains_any(input_lower, ACTION_TOKENS)
}

pub(crate) fn decompose_data_processing(_input: &str) -> Vec<String> {
    vec![
        "load data source".to_string(),
        "clean and preprocess data".to_string(),
        "analyze data".to_string(),
        "generate analysis report".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        assert!(matches("处理数据并转换格式"));
        assert!(matches("process the sales data"));
        assert!(!matches("load the data"));
        assert!(!matches("process the database migration"));
        assert!(!matches("analyze the metadata"));
    }
}
