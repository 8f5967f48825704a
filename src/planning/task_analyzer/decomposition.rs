mod computation;
mod data_processing;
mod fallback;
mod ip_arithmetic;
mod text_analysis;
mod time_query;

use crate::planning::task_types::DecompositionPlan;
use tracing::debug;

pub(crate) use computation::decompose_computation;
pub(crate) use data_processing::decompose_data_processing;
pub(crate) use fallback::decompose_generic;
pub(crate) use ip_arithmetic::decompose_ip_arithmetic;
pub(crate) use text_analysis::decompose_text_analysis;
pub(crate) use time_query::decompose_time_query;

/// A category predicate paired with the builder of its step template.
pub(crate) struct CategoryRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub build: fn(&str) -> Vec<String>,
}

/// Rules in priority order; the first match wins.
pub(crate) const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "ip_arithmetic",
        matches: ip_arithmetic::matches,
        build: decompose_ip_arithmetic,
    },
    CategoryRule {
        name: "text_analysis",
        matches: text_analysis::matches,
        build: decompose_text_analysis,
    },
    CategoryRule {
        name: "data_processing",
        matches: data_processing::matches,
        build: decompose_data_processing,
    },
    CategoryRule {
        name: "time_query",
        matches: time_query::matches,
        build: decompose_time_query,
    },
    CategoryRule {
        name: "computation",
        matches: computation::matches,
        build: decompose_computation,
    },
];

pub(crate) const FALLBACK_CATEGORY: &str = "generic";

/// Picks the first matching category rule, or the generic fallback.
///
/// Returns `None` only if a template produced no steps, which none of the
/// built-in templates do.
pub(crate) fn plan_description(description: &str) -> Option<DecompositionPlan> {
    let input_lower = description.to_lowercase();

    let (category, steps) = CATEGORY_RULES
        .iter()
        .find(|rule| (rule.matches)(&input_lower))
        .map(|rule| (rule.name, (rule.build)(&input_lower)))
        .unwrap_or_else(|| (FALLBACK_CATEGORY, decompose_generic(description)));

    debug!(category, steps = steps.len(), "decomposition rule selected");
    DecompositionPlan::new(category, steps)
}

pub(crate) fn contains_any(input_lower: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| input_lower.contains(t))
}

/// Matches a Latin token only where it is not glued to other ASCII letters or
/// digits, so "ip" matches "ip地址" and "my ip" but not "script".
pub(crate) fn contains_ascii_word(input_lower: &str, word: &str) -> bool {
    input_lower.match_indices(word).any(|(start, _)| {
        let before = input_lower[..start].chars().next_back();
        let after = input_lower[start + word.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}
