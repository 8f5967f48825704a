use anyhow::Result;
use std::fmt::Write as _;
use std::io::{self, Write};

use crate::planning::{ExecutionEnvelope, ExecutionMode};

/// Threshold that routes every task to atomic execution.
pub const FORCE_AI_THRESHOLD: u32 = u32::MAX;
/// Threshold that routes every task to decomposition.
pub const FORCE_DECOMPOSE_THRESHOLD: u32 = 0;

pub fn print_help() {
    println!(
        "Enter a task description to run it.\n\
         -a <task>  Force atomic (AI) execution for this task\n\
         -d <task>  Force decomposition for this task\n\
         /help      Show help\n\
         /clear     Clear screen\n\
         quit, exit, q, /quit  Quit"
    );
}

/// What one REPL line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplAction {
    Quit,
    Empty,
    Handled,
    Run {
        description: String,
        /// One-off threshold override
        threshold: Option<u32>,
    },
}

pub fn handle_command(line: &str) -> ReplAction {
    let line = line.trim();
    match line {
        "" => ReplAction::Empty,
        "quit" | "exit" | "q" | "/quit" | "/exit" => ReplAction::Quit,
        "/help" => {
            print_help();
            ReplAction::Handled
        }
        "/clear" => {
            print!("\x1B[2J\x1B[H");
            let _ = io::stdout().flush();
            ReplAction::Handled
        }
        _ => {
            let (description, threshold) = if let Some(rest) = line.strip_prefix("-a ") {
                (rest, Some(FORCE_AI_THRESHOLD))
            } else if let Some(rest) = line.strip_prefix("-d ") {
                (rest, Some(FORCE_DECOMPOSE_THRESHOLD))
            } else {
                (line, None)
            };
            ReplAction::Run {
                description: description.trim().to_string(),
                threshold,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Verbose,
    Json,
}

pub fn render_envelope(env: &ExecutionEnvelope, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(env)?);
    }

    let mut out = String::new();
    let score = env
        .score
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    writeln!(out, "mode: {} (score {score}, threshold {})", env.mode, env.threshold)?;

    if format == OutputFormat::Verbose && !env.reasons.is_empty() {
        writeln!(out, "reasons:")?;
        for reason in &env.reasons {
            writeln!(out, "  - {reason}")?;
        }
    }

    if !env.steps.is_empty() {
        writeln!(out, "steps:")?;
        for (i, step) in env.steps.iter().enumerate() {
            match env.results.get(i) {
                Some(result) => writeln!(out, "  {}. {step} -> {result}", i + 1)?,
                None => writeln!(out, "  {}. {step}", i + 1)?,
            }
        }
    }

    if format == OutputFormat::Verbose {
        if let Some(source) = &env.generated_source {
            writeln!(out, "source:\n{source}")?;
        }
        let path = env
            .transitions
            .iter()
            .map(|s| format!("{s:?}"))
            .collect::<Vec<_>>()
            .join(" -> ");
        writeln!(out, "transitions: {path}")?;
    }

    match (&env.mode, &env.final_result, &env.error) {
        (ExecutionMode::Error, _, Some(err)) => write!(out, "error: {err}")?,
        (_, Some(result), _) => write!(out, "result: {result}")?,
        _ => write!(out, "result: -")?,
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::OrchestratorState;

    fn decomposed() -> ExecutionEnvelope {
        let mut env = ExecutionEnvelope::new("处理数据", "task", 3);
        env.mode = ExecutionMode::Decomposed;
        env.score = Some(4);
        env.reasons = vec!["complex operation: 处理".into()];
        env.steps = vec!["load data source".into(), "analyze data".into()];
        env.results = vec!["loaded".into(), "done".into()];
        env.final_result = Some("done".into());
        env.transitions = vec![
            OrchestratorState::Idle,
            OrchestratorState::Scored,
            OrchestratorState::Decomposed,
            OrchestratorState::Completed,
        ];
        env
    }

    #[test]
    fn test_repl_line_parsing() {
        assert_eq!(handle_command("  "), ReplAction::Empty);
        assert_eq!(handle_command("q"), ReplAction::Quit);
        assert_eq!(handle_command("/quit"), ReplAction::Quit);
        assert_eq!(
            handle_command("-a 计算5的阶乘"),
            ReplAction::Run {
                description: "计算5的阶乘".into(),
                threshold: Some(FORCE_AI_THRESHOLD)
            }
        );
        assert_eq!(
            handle_command("-d hello"),
            ReplAction::Run {
                description: "hello".into(),
                threshold: Some(0)
            }
        );
        assert_eq!(
            handle_command("获取当前系统时间"),
            ReplAction::Run {
                description: "获取当前系统时间".into(),
                threshold: None
            }
        );
    }

    #[test]
    fn test_render_plain() {
        let text = render_envelope(&decomposed(), OutputFormat::Plain).unwrap();
        assert_eq!(
            text,
            "mode: decomposed (score 4, threshold 3)\n\
             steps:\n  1. load data source -> loaded\n  2. analyze data -> done\n\
             result: done"
        );
    }

    #[test]
    fn test_render_verbose_includes_reasons_and_transitions() {
        let text = render_envelope(&decomposed(), OutputFormat::Verbose).unwrap();
        assert!(text.contains("  - complex operation: 处理"));
        assert!(text.contains("transitions: Idle -> Scored -> Decomposed -> Completed"));
    }

    #[test]
    fn test_render_error() {
        let mut env = ExecutionEnvelope::new("x", "task", 0);
        env.error = Some("step 2 failed".into());
        let text = render_envelope(&env, OutputFormat::Plain).unwrap();
        assert!(text.ends_with("error: step 2 failed"));
    }

    #[test]
    fn test_render_json() {
        let text = render_envelope(&decomposed(), OutputFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["mode"], "decomposed");
        assert_eq!(v["final_result"], "done");
        assert_eq!(v["transitions"][3], "completed");
    }
}
