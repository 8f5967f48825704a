/// Keyword weights, evaluated in this order.
///
/// Positive weights mark multi-step or heavy operations, negative weights mark
/// simple lookups. Latin entries are matched against the lowercased input.
pub(crate) const FEATURE_WEIGHTS: &[(&str, i32)] = &[
    // Connectives (multiple steps)
    ("并且", 2),
    ("然后", 2),
    ("接着", 2),
    ("同时", 2),
    ("以及", 1),
    ("最后", 1),
    ("最终", 1),
    ("再", 1),
    ("还要", 2),
    ("then", 2),
    ("afterwards", 2),
    ("meanwhile", 2),
    ("as well as", 1),
    ("finally", 1),
    ("also", 1),
    // Complex operations
    ("分析", 2),
    ("统计", 2),
    ("计算", 2),
    ("处理", 2),
    ("生成", 2),
    ("转换", 2),
    ("验证", 2),
    ("提取", 2),
    ("匹配", 2),
    ("解析", 2),
    ("排序", 2),
    ("筛选", 2),
    ("格式化", 2),
    ("优化", 3),
    ("预测", 3),
    ("analyze", 2),
    ("statistic", 2),
    ("compute", 2),
    ("calculate", 2),
    ("process", 2),
    ("generate", 2),
    ("convert", 2),
    ("validate", 2),
    ("extract", 2),
    ("parse", 2),
    ("sort", 2),
    ("filter", 2),
    ("format", 2),
    ("optimize", 3),
    ("predict", 3),
    // Simple operations
    ("获取", -1),
    ("查询", -1),
    ("显示", -1),
    ("返回", -1),
    ("输出", -1),
    ("fetch", -1),
    ("query", -1),
    ("show", -1),
    ("display", -1),
    ("print", -1),
];

/// Action verbs counted by the verb-density feature.
pub(crate) const ACTION_VERBS: &[&str] = &[
    "计算", "分析", "统计", "处理", "生成", "转换", "验证", "提取", "获取", "查询", "创建", "删除",
    "修改", "格式化", "排序", "筛选", "compute", "calculate", "analyze", "count", "process",
    "generate", "convert", "validate", "extract", "fetch", "query", "create", "delete", "modify",
    "format", "sort", "filter",
];

/// Full-width and half-width clause boundaries.
pub(crate) const CLAUSE_MARKS: &[char] = &['，', '。', '、', '；', ',', '.', ';'];

pub(crate) const LENGTH_LIMIT: usize = 30;
pub(crate) const CLAUSE_MIN: usize = 2;
pub(crate) const VERB_MIN: usize = 3;

/// Counts non-overlapping occurrences of every action verb.
pub(crate) fn count_action_verbs(input_lower: &str) -> usize {
    ACTION_VERBS
        .iter()
        .map(|verb| input_lower.matches(verb).count())
        .sum()
}

pub(crate) fn count_clause_marks(input: &str) -> usize {
    input.chars().filter(|c| CLAUSE_MARKS.contains(c)).count()
}

/// Returns every table entry found in the input, in table order.
pub(crate) fn matched_features(input_lower: &str) -> Vec<(&'static str, i32)> {
    FEATURE_WEIGHTS
        .iter()
        .filter(|(keyword, _)| input_lower.contains(keyword))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_features_keeps_table_order() {
        let found = matched_features("生成报告，然后分析");
        let keywords: Vec<_> = found.iter().map(|(k, _)| *k).collect();
        assert_eq!(keywords, vec!["然后", "分析", "生成"]);
    }

    #[test]
    fn test_count_clause_marks_mixed_width() {
        assert_eq!(count_clause_marks("a，b。c、d；e,f.g;h"), 7);
        assert_eq!(count_clause_marks("no marks here"), 0);
    }

    #[test]
    fn test_count_action_verbs() {
        assert_eq!(count_action_verbs("计算并计算，然后分析"), 3);
        assert_eq!(count_action_verbs("fetch and format the time"), 2);
        assert_eq!(count_action_verbs(""), 0);
    }

    #[test]
    fn test_table_has_no_duplicate_keywords() {
        let mut seen = std::collections::HashSet::new();
        for (keyword, _) in FEATURE_WEIGHTS {
            assert!(seen.insert(*keyword), "duplicate keyword {keyword}");
        }
    }
}
