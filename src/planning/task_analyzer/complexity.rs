use crate::planning::task_types::ComplexityReport;

use super::patterns::*;

pub(crate) fn score_description(description: &str) -> ComplexityReport {
    if description.is_empty() {
        return ComplexityReport {
            score: 0,
            reasons: vec!["no description provided".to_string()],
        };
    }

    let input_lower = description.to_lowercase();
    let mut score: i64 = 0;
    let mut reasons = Vec::new();

    // Length
    if description.chars().count() > LENGTH_LIMIT {
        score += 1;
        reasons.push(format!("length exceeds {LENGTH_LIMIT} characters"));
    }

    // Clauses
    let clauses = count_clause_marks(description);
    if clauses >= CLAUSE_MIN {
        score += clauses as i64;
        reasons.push(format!("contains {clauses} clauses"));
    }

    // Keywords
    for (keyword, weight) in matched_features(&input_lower) {
        score += i64::from(weight);
        if weight > 0 {
            reasons.push(format!("complex operation: {keyword}"));
        } else {
            reasons.push(format!("simple operation: {keyword}"));
        }
    }

    // Verb density
    let verbs = count_action_verbs(&input_lower);
    if verbs >= VERB_MIN {
        score += verbs as i64 - 1;
        reasons.push(format!("contains {verbs} actions"));
    }

    ComplexityReport {
        score: score.clamp(0, i64::from(u32::MAX)) as u32,
        reasons,
    }
}
