use serde::{Deserialize, Serialize};

/// How a task was finally carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Handled as one atomic step by the local generator
    Direct,
    /// Broken into ordered steps, each simulated in turn
    Decomposed,
    /// Handled as one atomic step by the remote code generator
    AiGenerated,
    /// No result could be produced
    Error,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Direct => "direct",
            ExecutionMode::Decomposed => "decomposed",
            ExecutionMode::AiGenerated => "ai_generated",
            ExecutionMode::Error => "error",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator states, in the order a run may visit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Scored,
    Direct,
    AiGenerated,
    Decomposed,
    Completed,
    Failed,
}

impl OrchestratorState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;

        match (self, next) {
            (Idle, Scored) => true,
            (Scored, Direct | AiGenerated | Decomposed) => true,
            // collaborator failure falls back to decomposition
            (AiGenerated, Decomposed) => true,
            (Direct | AiGenerated | Decomposed, Completed) => true,
            (Scored | Direct | AiGenerated | Decomposed, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorState::Completed | OrchestratorState::Failed)
    }
}

/// Score produced by the complexity scorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub score: u32,
    /// One entry per contributing feature, in evaluation order
    pub reasons: Vec<String>,
}

/// Ordered, non-empty list of natural-language step instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompositionPlan {
    /// Name of the category rule that produced the plan
    pub category: &'static str,
    steps: Vec<String>,
}

impl DecompositionPlan {
    /// Returns `None` for an empty step list; a plan always has at least one step.
    pub fn new(category: &'static str, steps: Vec<String>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self { category, steps })
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }
}

/// Uniform result returned to the caller for every run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEnvelope {
    pub mode: ExecutionMode,
    pub description: String,
    pub function_name: String,
    pub score: Option<u32>,
    pub threshold: u32,
    pub reasons: Vec<String>,
    pub steps: Vec<String>,
    pub results: Vec<String>,
    pub final_result: Option<String>,
    pub generated_source: Option<String>,
    pub error: Option<String>,
    pub transitions: Vec<OrchestratorState>,
}

impl ExecutionEnvelope {
    pub fn new(description: impl Into<String>, function_name: impl Into<String>, threshold: u32) -> Self {
        Self {
            mode: ExecutionMode::Error,
            description: description.into(),
            function_name: function_name.into(),
            score: None,
            threshold,
            reasons: Vec::new(),
            steps: Vec::new(),
            results: Vec::new(),
            final_result: None,
            generated_source: None,
            error: None,
            transitions: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.mode != ExecutionMode::Error
    }

    /// Checks the decomposed-mode invariant: non-empty steps, one result per step,
    /// and the final result equal to the last step result.
    pub fn is_consistent(&self) -> bool {
        match self.mode {
            ExecutionMode::Decomposed => {
                !self.steps.is_empty()
                    && self.results.len() == self.steps.len()
                    && self.final_result.as_ref() == self.results.last()
            }
            ExecutionMode::Direct | ExecutionMode::AiGenerated => self.final_result.is_some(),
            ExecutionMode::Error => self.error.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_rejects_empty_steps() {
        assert!(DecompositionPlan::new("fallback", vec![]).is_none());

        let plan = DecompositionPlan::new("time", vec!["fetch system time".to_string()]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.into_steps(), vec!["fetch system time".to_string()]);
    }

    #[test]
    fn test_state_transitions() {
        use OrchestratorState::*;

        assert!(Idle.can_transition_to(Scored));
        assert!(Scored.can_transition_to(AiGenerated));
        assert!(AiGenerated.can_transition_to(Decomposed));
        assert!(Decomposed.can_transition_to(Completed));
        assert!(Decomposed.can_transition_to(Failed));

        assert!(!Idle.can_transition_to(Decomposed));
        assert!(!Direct.can_transition_to(Decomposed));
        assert!(!Completed.can_transition_to(Scored));
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
    }

    #[test]
    fn test_envelope_consistency() {
        let mut env = ExecutionEnvelope::new("x", "task", 3);
        env.mode = ExecutionMode::Decomposed;
        env.steps = vec!["a".into(), "b".into()];
        env.results = vec!["1".into(), "2".into()];
        env.final_result = Some("2".into());
        assert!(env.is_consistent());

        env.final_result = Some("1".into());
        assert!(!env.is_consistent());

        env.results.pop();
        assert!(!env.is_consistent());
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionMode::AiGenerated).unwrap();
        assert_eq!(json, "\"ai_generated\"");
    }
}
