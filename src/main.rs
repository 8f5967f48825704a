mod cli;
mod codegen;
mod config;
mod llm;
mod logging;
mod planning;

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use dotenvy::dotenv;
use tracing::{info, warn};

use crate::cli::{
    FORCE_AI_THRESHOLD, FORCE_DECOMPOSE_THRESHOLD, OutputFormat, ReplAction, handle_command,
    render_envelope,
};
use crate::codegen::{CodeGenerator, GenerationRequest, RemoteCodeGenerator};
use crate::config::{AppConfig, CliOverrides};
use crate::planning::Orchestrator;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "smart",
    version,
    about = "Score a task description and run it directly, via AI, or as decomposed steps"
)]
struct Cli {
    /// Task description; words are joined with single spaces
    task: Vec<String>,

    /// Read tasks line by line from stdin
    #[arg(short, long, action = ArgAction::SetTrue)]
    interactive: bool,

    /// Force atomic (AI) execution
    #[arg(short = 'a', long = "ai", action = ArgAction::SetTrue, conflicts_with = "decompose")]
    force_ai: bool,

    /// Force decomposition into steps
    #[arg(short, long, action = ArgAction::SetTrue)]
    decompose: bool,

    /// Disable the remote code generator
    #[arg(long, action = ArgAction::SetTrue)]
    no_ai: bool,

    /// Complexity threshold; scores at or above it are decomposed
    #[arg(short, long)]
    threshold: Option<u32>,

    /// Show reasons, transitions and generated source
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Print the result envelope as JSON
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    json: bool,

    /// Declared name of the target function
    #[arg(long, default_value = "task")]
    function_name: String,

    /// Positional argument for the target function (repeatable)
    #[arg(long = "arg")]
    args: Vec<String>,

    /// Keyword argument for the target function as K=V (repeatable)
    #[arg(long = "kwarg", value_parser = parse_kwarg)]
    kwargs: Vec<(String, String)>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// API key (set via env SMART_TASK_API_KEY or OPENAI_API_KEY recommended)
    #[arg(long)]
    api_key: Option<String>,

    /// Log level (error,warn,info,debug,trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_kwarg(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => bail!("expected KEY=VALUE, got '{s}'"),
    }
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let complexity_threshold = if self.force_ai {
            Some(FORCE_AI_THRESHOLD)
        } else if self.decompose {
            Some(FORCE_DECOMPOSE_THRESHOLD)
        } else {
            self.threshold
        };
        CliOverrides {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            complexity_threshold,
            no_ai: self.no_ai,
        }
    }

    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.verbose {
            OutputFormat::Verbose
        } else {
            OutputFormat::Plain
        }
    }

    fn request(&self, description: String) -> GenerationRequest {
        GenerationRequest {
            description,
            function_name: self.function_name.clone(),
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

fn build_orchestrator(cfg: &AppConfig) -> Result<Orchestrator> {
    let remote = RemoteCodeGenerator::from_config(cfg).context("build remote code generator")?;
    if cfg.ai_enabled && remote.is_none() {
        warn!("AI is enabled but no API key is configured; running without it");
    }
    let ai = remote.map(|r| Box::new(r) as Box<dyn CodeGenerator>);
    Ok(Orchestrator::new(cfg.complexity_threshold).with_ai_generator(ai))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();
    let level = logging::resolve_level(
        cli.log_level.as_deref(),
        std::env::var(logging::LOG_ENV).ok(),
    );
    logging::init_logging(&level, cli.log_file.as_deref())?;

    let cfg = AppConfig::from_cli(cli.overrides())?;
    info!(
        threshold = cfg.complexity_threshold,
        ai_enabled = cfg.ai_enabled,
        model = %cfg.model,
        base_url = %cfg.base_url,
        "app config"
    );
    let orchestrator = build_orchestrator(&cfg)?;

    if cli.interactive {
        run_cli_loop(&cli, &orchestrator).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let description = cli.task.join(" ");
    if description.trim().is_empty() {
        eprintln!("usage: smart [OPTIONS] <TASK>...  (or -i for interactive mode, --help for details)");
        return Ok(ExitCode::from(2));
    }

    let envelope = orchestrator.run(&cli.request(description)).await;
    println!("{}", render_envelope(&envelope, cli.output_format())?);
    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_cli_loop(cli: &Cli, orchestrator: &Orchestrator) -> Result<()> {
    println!(
        "smart (interactive) - threshold {}, AI {} - type /help for commands",
        orchestrator.threshold(),
        if orchestrator.ai_enabled() { "on" } else { "off" }
    );
    let stdin = io::stdin();
    let reader = BufReader::new(stdin).lines();

    prompt()?;
    for line in reader {
        let line = line?;
        match handle_command(&line) {
            ReplAction::Quit => break,
            ReplAction::Empty => println!("enter a task description, or /help"),
            ReplAction::Handled => {}
            ReplAction::Run {
                description,
                threshold,
            } => {
                let req = cli.request(description);
                let threshold = threshold.unwrap_or(orchestrator.threshold());
                let envelope = orchestrator.run_with_threshold(&req, threshold).await;
                println!("{}", render_envelope(&envelope, cli.output_format())?);
            }
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_force_flags() {
        let cli = Cli::try_parse_from(["smart", "-a", "hello"]).unwrap();
        assert_eq!(cli.overrides().complexity_threshold, Some(u32::MAX));

        let cli = Cli::try_parse_from(["smart", "-d", "-t", "9", "hello"]).unwrap();
        assert_eq!(cli.overrides().complexity_threshold, Some(0));

        let cli = Cli::try_parse_from(["smart", "-t", "9", "hello"]).unwrap();
        assert_eq!(cli.overrides().complexity_threshold, Some(9));

        assert!(Cli::try_parse_from(["smart", "-a", "-d", "hello"]).is_err());
    }

    #[test]
    fn test_cli_task_words_and_args() {
        let cli = Cli::try_parse_from([
            "smart",
            "--no-ai",
            "--function-name",
            "add",
            "--arg",
            "1",
            "--arg",
            "2",
            "--kwarg",
            "scale=10",
            "add",
            "two",
            "numbers",
        ])
        .unwrap();
        assert!(cli.overrides().no_ai);

        let req = cli.request(cli.task.join(" "));
        assert_eq!(req.description, "add two numbers");
        assert_eq!(req.function_name, "add");
        assert_eq!(req.flattened_args(), "1, 2, scale=10");
    }

    #[test]
    fn test_parse_kwarg() {
        assert_eq!(
            parse_kwarg("k=v=w").unwrap(),
            ("k".to_string(), "v=w".to_string())
        );
        assert!(parse_kwarg("novalue").is_err());
        assert!(parse_kwarg("=v").is_err());
    }

    #[test]
    fn test_output_format() {
        let cli = Cli::try_parse_from(["smart", "--json", "x"]).unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Json);
        let cli = Cli::try_parse_from(["smart", "-v", "x"]).unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Verbose);
    }
}
