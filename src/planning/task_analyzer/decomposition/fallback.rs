use tracing::info;

/// Descriptions longer than this get the long-form plan.
const LONG_FORM_LIMIT: usize = 40;

pub(crate) fn decompose_generic(description: &str) -> Vec<String> {
    info!("Using generic decomposition for uncategorized task");

    if description.chars().count() > LONG_FORM_LIMIT {
        vec![
            "parse task requirement".to_string(),
            "prepare execution environment".to_string(),
            "execute core function".to_string(),
            "assemble output".to_string(),
        ]
    } else {
        vec![
            "analyze task requirement".to_string(),
            "perform task operation".to_string(),
            "return task result".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_exclusive() {
        assert_eq!(decompose_generic(&"字".repeat(40)).len(), 3);
        assert_eq!(decompose_generic(&"字".repeat(41)).len(), 4);
    }
}
