use thiserror::Error;

/// Raised by a step handler that cannot produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step {index} rejected: {reason}")]
pub struct StepError {
    pub index: usize,
    pub reason: String,
}

/// Executes one step of a decomposition plan.
///
/// `index` is 1-based. Implementations see only the step text and its position;
/// results of earlier steps are not passed forward.
pub trait StepExecutor: Send + Sync {
    fn execute(&self, step: &str, index: usize, total: usize) -> Result<String, StepError>;
}

/// Canned outputs keyed by the topic of a step, then by its action.
const CANNED_RESULTS: &[(&str, &[(&str, &str)])] = &[
    (
        "ip",
        &[
            ("acquire", "192.168.1.100"),
            ("split", "[192, 168, 1, 100]"),
            ("convert", "numbers: [192, 168, 1, 100]"),
            ("sum", "461 (192+168+1+100)"),
        ],
    ),
    (
        "text",
        &[
            ("read", "Hello World Python"),
            ("count", "characters: 18, words: 3"),
            ("transformation", "HELLO WORLD PYTHON"),
        ],
    ),
    ("keywords", &[("extract", "['Hello', 'World', 'Python']")]),
    ("analysis results", &[("consolidate", "text analysis complete")]),
    (
        "data",
        &[
            ("load", "loaded 1000 records"),
            ("clean", "1000 records cleaned, 12 invalid rows dropped"),
            ("analyze", "mean: 42.0, median: 40.5, max: 97"),
        ],
    ),
    ("report", &[("generate", "analysis report generated")]),
    (
        "time",
        &[
            ("fetch", "2025-11-24 21:40:00"),
            ("format", "2025年11月24日 21:40:00"),
        ],
    ),
    (
        "computation",
        &[
            ("parse", "identified arithmetic expression"),
            ("perform", "computation result: 42"),
            ("return", "42"),
        ],
    ),
];

/// Placeholder executor that maps recognizable step text to sample output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepSimulator;

impl StepSimulator {
    pub fn new() -> Self {
        Self
    }

    pub fn simulate(&self, step: &str, index: usize, total: usize) -> String {
        let step_lower = step.to_lowercase();
        let words: Vec<&str> = step_lower.split_whitespace().collect();

        CANNED_RESULTS
            .iter()
            .filter(|(topic, _)| topic_matches(topic, &words, &step_lower))
            .flat_map(|(_, actions)| actions.iter())
            .find(|(action, _)| words.contains(action))
            .map(|(_, output)| output.to_string())
            .unwrap_or_else(|| format!("step {index} of {total} completed"))
    }
}

/// Single-word topics must match a whole word; phrases match as substrings.
fn topic_matches(topic: &str, words: &[&str], step_lower: &str) -> bool {
    if topic.contains(' ') {
        step_lower.contains(topic)
    } else {
        words.contains(&topic)
    }
}

impl StepExecutor for StepSimulator {
    fn execute(&self, step: &str, index: usize, total: usize) -> Result<String, StepError> {
        Ok(self.simulate(step, index, total))
    }
}
