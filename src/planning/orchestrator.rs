use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codegen::{CodeGenerator, GeneratedCode, GenerationRequest, LocalCodeGenerator};
use crate::planning::step_executor::{StepError, StepExecutor, StepSimulator};
use crate::planning::task_analyzer::{DecompositionPlanner, TaskAnalyzer};
use crate::planning::task_types::*;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("no decomposition plan could be produced")]
    PlanningImpossible,
    #[error("step {index} failed: {source}")]
    StepFailed { index: usize, source: StepError },
    #[error("direct execution failed: {0}")]
    DirectFailed(String),
}

/// Scores a task, then routes it to direct, AI or decomposed execution.
///
/// Scores below the threshold are handled atomically: by the AI generator when
/// one is configured, otherwise by the direct generator. Everything else, and
/// any AI failure, goes through the planner and the step executor.
pub struct Orchestrator {
    analyzer: TaskAnalyzer,
    planner: Box<dyn DecompositionPlanner>,
    executor: Box<dyn StepExecutor>,
    direct: Box<dyn CodeGenerator>,
    ai: Option<Box<dyn CodeGenerator>>,
    threshold: u32,
}

/// Bookkeeping for one invocation.
struct Run {
    state: OrchestratorState,
    envelope: ExecutionEnvelope,
}

impl Run {
    fn new(mut envelope: ExecutionEnvelope) -> Self {
        envelope.transitions.push(OrchestratorState::Idle);
        Self {
            state: OrchestratorState::Idle,
            envelope,
        }
    }

    fn transition(&mut self, next: OrchestratorState) {
        debug_assert!(!self.state.is_terminal(), "run already finished in {:?}", self.state);
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug_assert!(
            !next.is_terminal() || self.envelope.is_consistent(),
            "inconsistent envelope on entering {next:?}"
        );
        debug!(from = ?self.state, to = ?next, "orchestrator transition");
        self.state = next;
        self.envelope.transitions.push(next);
    }

    fn complete_atomic(mut self, mode: ExecutionMode, out: GeneratedCode) -> ExecutionEnvelope {
        self.envelope.mode = mode;
        self.envelope.final_result = Some(out.result);
        self.envelope.generated_source = Some(out.source);
        self.transition(OrchestratorState::Completed);
        info!(mode = %mode, "task completed");
        self.envelope
    }

    fn fail(mut self, err: OrchestratorError) -> ExecutionEnvelope {
        error!(error = %err, state = ?self.state, "task failed");
        self.envelope.mode = ExecutionMode::Error;
        self.envelope.error = Some(err.to_string());
        self.transition(OrchestratorState::Failed);
        self.envelope
    }
}

impl Orchestrator {
    /// Simulated steps, local direct generator, no AI.
    pub fn new(threshold: u32) -> Self {
        Self {
            analyzer: TaskAnalyzer::new(),
            planner: Box::new(TaskAnalyzer::new()),
            executor: Box::new(StepSimulator::new()),
            direct: Box::new(LocalCodeGenerator::new()),
            ai: None,
            threshold,
        }
    }

    #[cfg(test)]
    pub fn with_planner(mut self, planner: Box<dyn DecompositionPlanner>) -> Self {
        self.planner = planner;
        self
    }

    #[cfg(test)]
    pub fn with_step_executor(mut self, executor: Box<dyn StepExecutor>) -> Self {
        self.executor = executor;
        self
    }

    #[cfg(test)]
    pub fn with_direct_generator(mut self, generator: Box<dyn CodeGenerator>) -> Self {
        self.direct = generator;
        self
    }

    pub fn with_ai_generator(mut self, generator: Option<Box<dyn CodeGenerator>>) -> Self {
        self.ai = generator;
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }

    pub async fn run(&self, req: &GenerationRequest) -> ExecutionEnvelope {
        self.run_with_threshold(req, self.threshold).await
    }

    /// Like [`Orchestrator::run`] with a one-off threshold.
    pub async fn run_with_threshold(
        &self,
        req: &GenerationRequest,
        threshold: u32,
    ) -> ExecutionEnvelope {
        let mut run = Run::new(ExecutionEnvelope::new(
            req.description.clone(),
            req.function_name.clone(),
            threshold,
        ));

        let report = self.analyzer.score(&req.description);
        run.envelope.score = Some(report.score);
        run.envelope.reasons = report.reasons;
        run.transition(OrchestratorState::Scored);

        if report.score >= threshold {
            info!(score = report.score, threshold, "score at or above threshold, decomposing");
            return self.decompose(run, &req.description);
        }

        match &self.ai {
            Some(ai) => {
                run.transition(OrchestratorState::AiGenerated);
                match ai.generate(req).await {
                    Ok(out) => run.complete_atomic(ExecutionMode::AiGenerated, out),
                    Err(e) => {
                        warn!(
                            generator = ai.name(),
                            error = %e,
                            "code generation failed, falling back to decomposition"
                        );
                        self.decompose(run, &req.description)
                    }
                }
            }
            None => {
                run.transition(OrchestratorState::Direct);
                match self.direct.generate(req).await {
                    Ok(out) => run.complete_atomic(ExecutionMode::Direct, out),
                    Err(e) => run.fail(OrchestratorError::DirectFailed(e.to_string())),
                }
            }
        }
    }

    fn decompose(&self, mut run: Run, description: &str) -> ExecutionEnvelope {
        run.transition(OrchestratorState::Decomposed);

        let Some(plan) = self.planner.plan(description) else {
            return run.fail(OrchestratorError::PlanningImpossible);
        };
        info!(category = plan.category, steps = plan.len(), "task decomposed");

        let steps = plan.into_steps();
        let total = steps.len();
        run.envelope.steps = steps.clone();

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            match self.executor.execute(step, index, total) {
                Ok(result) => {
                    debug!(index, total, step = %step, result = %result, "step completed");
                    run.envelope.results.push(result);
                }
                Err(source) => {
                    return run.fail(OrchestratorError::StepFailed { index, source });
                }
            }
        }

        let mode = ExecutionMode::Decomposed;
        run.envelope.mode = mode;
        run.envelope.final_result = run.envelope.results.last().cloned();
        run.transition(OrchestratorState::Completed);
        info!(mode = %mode, steps = total, "task completed");
        run.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::CodegenError;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use OrchestratorState::*;

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn orchestrator(threshold: u32) -> Orchestrator {
        Orchestrator::new(threshold)
            .with_direct_generator(Box::new(LocalCodeGenerator::with_clock(fixed_clock)))
    }

    struct StubGenerator {
        calls: Arc<AtomicUsize>,
        reply: Result<GeneratedCode, CodegenError>,
    }

    impl StubGenerator {
        fn boxed(
            reply: Result<GeneratedCode, CodegenError>,
        ) -> (Box<dyn CodeGenerator>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let stub = StubGenerator {
                calls: calls.clone(),
                reply,
            };
            (Box::new(stub), calls)
        }
    }

    #[async_trait::async_trait]
    impl CodeGenerator for StubGenerator {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, _req: &GenerationRequest) -> Result<GeneratedCode, CodegenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    /// Rejects the step at `fail_at`.
    struct RejectingExecutor {
        fail_at: usize,
    }

    impl StepExecutor for RejectingExecutor {
        fn execute(&self, step: &str, index: usize, _total: usize) -> Result<String, StepError> {
            if index == self.fail_at {
                Err(StepError {
                    index,
                    reason: format!("cannot run '{step}'"),
                })
            } else {
                Ok(format!("ok {index}"))
            }
        }
    }

    /// Never produces a plan.
    struct EmptyPlanner;

    impl DecompositionPlanner for EmptyPlanner {
        fn plan(&self, _description: &str) -> Option<DecompositionPlan> {
            None
        }
    }

    fn req(description: &str) -> GenerationRequest {
        GenerationRequest::new(description, "task")
    }

    #[tokio::test]
    async fn test_empty_description_runs_direct() {
        let env = orchestrator(3).run(&req("")).await;
        assert_eq!(env.mode, ExecutionMode::Direct);
        assert_eq!(env.score, Some(0));
        assert_eq!(env.reasons, vec!["no description provided".to_string()]);
        assert_eq!(env.transitions, vec![Idle, Scored, Direct, Completed]);
        assert!(env.is_consistent());
    }

    #[tokio::test]
    async fn test_simple_task_without_ai_is_direct() {
        let env = orchestrator(3).run(&req("获取当前系统时间")).await;
        assert_eq!(env.mode, ExecutionMode::Direct);
        assert_eq!(env.final_result.as_deref(), Some("2025-01-02 03:04:05"));
        assert!(env.generated_source.is_some());
        assert!(env.steps.is_empty());
    }

    #[tokio::test]
    async fn test_simple_task_with_ai_is_ai_generated() {
        let (ai, calls) = StubGenerator::boxed(Ok(GeneratedCode::new("now", "fn task() {}")));
        let env = orchestrator(3)
            .with_ai_generator(Some(ai))
            .run(&req("获取当前系统时间"))
            .await;
        assert_eq!(env.mode, ExecutionMode::AiGenerated);
        assert_eq!(env.final_result.as_deref(), Some("now"));
        assert_eq!(env.generated_source.as_deref(), Some("fn task() {}"));
        assert_eq!(env.transitions, vec![Idle, Scored, AiGenerated, Completed]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compound_task_is_decomposed_without_calling_ai() {
        let (ai, calls) = StubGenerator::boxed(Ok(GeneratedCode::new("x", "")));
        let env = orchestrator(3)
            .with_ai_generator(Some(ai))
            .run(&req("分析数据，统计结果，生成报告。"))
            .await;
        assert_eq!(env.mode, ExecutionMode::Decomposed);
        assert!(env.score.unwrap() >= 5);
        assert!(env.steps.len() >= 4);
        assert_eq!(env.results.len(), env.steps.len());
        assert_eq!(env.final_result.as_ref(), env.results.last());
        assert_eq!(env.transitions, vec![Idle, Scored, Decomposed, Completed]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ip_plan_carries_sum_annotation() {
        let env = orchestrator(0).run(&req("把当前的ip地址进行求和，根据.进行分开")).await;
        assert_eq!(env.mode, ExecutionMode::Decomposed);
        assert_eq!(
            env.steps,
            vec![
                "acquire current IP address",
                "split IP address into segments",
                "convert IP segments to numbers",
                "sum IP segments",
            ]
        );
        assert_eq!(env.final_result.as_deref(), Some("461 (192+168+1+100)"));
    }

    #[tokio::test]
    async fn test_threshold_zero_always_decomposes() {
        let (ai, calls) = StubGenerator::boxed(Ok(GeneratedCode::new("x", "")));
        let orch = orchestrator(0).with_ai_generator(Some(ai));
        for input in ["获取当前系统时间", "hello", "计算5的阶乘"] {
            let env = orch.run(&req(input)).await;
            assert_eq!(env.mode, ExecutionMode::Decomposed, "{input}");
            assert!(env.is_consistent());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_with_threshold_overrides_default() {
        let orch = orchestrator(0);
        let env = orch.run_with_threshold(&req("获取当前系统时间"), u32::MAX).await;
        assert_eq!(env.mode, ExecutionMode::Direct);
        assert_eq!(env.threshold, u32::MAX);
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_decomposition() {
        let (ai, calls) = StubGenerator::boxed(Err(CodegenError::Timeout));
        let env = orchestrator(3)
            .with_ai_generator(Some(ai))
            .run(&req("获取当前系统时间"))
            .await;
        assert_eq!(env.mode, ExecutionMode::Decomposed);
        assert_eq!(env.steps, vec!["fetch system time"]);
        assert_eq!(env.results.len(), 1);
        assert_eq!(env.error, None);
        assert_eq!(
            env.transitions,
            vec![Idle, Scored, AiGenerated, Decomposed, Completed]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_server_error_falls_back_to_decomposition() {
        use crate::codegen::RemoteCodeGenerator;
        use crate::config::LlmConfig;
        use crate::llm::OpenAIClient;
        use httptest::{Expectation, Server, matchers::*, responders::*};

        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .times(1)
                .respond_with(status_code(500).body("down")),
        );
        let client = OpenAIClient::new(format!("{}/", server.url_str("")), "k")
            .unwrap()
            .with_llm_config(LlmConfig {
                max_retries: 0,
                ..LlmConfig::default()
            });
        let remote = RemoteCodeGenerator::new(client, "gpt-test");

        let env = orchestrator(3)
            .with_ai_generator(Some(Box::new(remote)))
            .run(&req("获取当前系统时间"))
            .await;
        assert_eq!(env.mode, ExecutionMode::Decomposed);
        assert!(env.is_consistent());
    }

    #[tokio::test]
    async fn test_failing_step_yields_error_envelope() {
        let env = orchestrator(0)
            .with_step_executor(Box::new(RejectingExecutor { fail_at: 2 }))
            .run(&req("处理数据"))
            .await;
        assert_eq!(env.mode, ExecutionMode::Error);
        assert_eq!(env.steps.len(), 4);
        assert_eq!(env.results, vec!["ok 1".to_string()]);
        assert!(env.error.as_deref().unwrap().contains("step 2"));
        assert_eq!(env.transitions, vec![Idle, Scored, Decomposed, Failed]);
        assert!(env.is_consistent());
        assert!(!env.is_success());
    }

    #[tokio::test]
    async fn test_missing_plan_yields_error_envelope() {
        let env = orchestrator(0)
            .with_planner(Box::new(EmptyPlanner))
            .run(&req("处理数据"))
            .await;
        assert_eq!(env.mode, ExecutionMode::Error);
        assert_eq!(env.error.as_deref(), Some("no decomposition plan could be produced"));
        assert!(env.steps.is_empty());
        assert!(env.results.is_empty());
        assert_eq!(env.final_result, None);
        assert_eq!(env.transitions, vec![Idle, Scored, Decomposed, Failed]);
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let orch = orchestrator(3);
        let first = orch.run(&req("分析数据，统计结果，生成报告。")).await;
        let second = orch.run(&req("分析数据，统计结果，生成报告。")).await;
        assert_eq!(first, second);
    }
}
