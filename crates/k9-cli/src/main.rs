//! `k9` - ask the safety pipeline from the command line

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use k9_data::{DataAccess, JsonDirSource};
use k9_pipeline::{Outcome, Pipeline, PipelineConfig, RULES};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "k9=info,k9_pipeline=info,k9_data=info";

fn config_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("config")
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .help("TOML configuration file"),
    )
    .arg(
        Arg::new("data-dir")
            .long("data-dir")
            .value_parser(value_parser!(PathBuf))
            .help("Directory holding the dataset files"),
    )
}

fn cli() -> Command {
    Command::new("k9")
        .version(k9_pipeline::VERSION)
        .about("K9 Mining Safety decision-support pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            config_args(Command::new("ask").about("Answer one query"))
                .arg(Arg::new("query").required(true).help("Question in natural language"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full final state as JSON"),
                )
                .arg(
                    Arg::new("trace")
                        .long("trace")
                        .action(ArgAction::SetTrue)
                        .help("Print visited nodes and the reasoning trail"),
                ),
        )
        .subcommand(config_args(
            Command::new("chat").about("Answer queries from stdin, one per line, in one session"),
        ))
        .subcommand(config_args(
            Command::new("check-data").about("Load every dataset and report contract violations"),
        ))
        .subcommand(Command::new("intents").about("List the intent classification rules"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Configuration file, if any, with `--data-dir` applied on top
fn resolve_config(args: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.get_one::<PathBuf>("data-dir") {
        config = config.with_data_dir(dir.clone());
    }
    Ok(config)
}

fn print_outcome(outcome: &Outcome, trace: bool) {
    let state = &outcome.state;
    println!("{}", state.answer.as_deref().unwrap_or_default());

    let suggestion = state
        .analysis
        .as_ref()
        .and_then(|a| a.metrics.as_ref())
        .and_then(|m| m.visual_suggestions.first());
    if let Some(suggestion) = suggestion {
        println!("\n{}", suggestion.question);
    }

    if trace {
        let visited: Vec<&str> = outcome.trace.visited().iter().map(|k| k.as_str()).collect();
        println!("\nnodes: {}", visited.join(" -> "));
        for entry in state.reasoning() {
            println!("  - {entry}");
        }
    }
}

fn ask(args: &ArgMatches) -> Result<()> {
    let query = args.get_one::<String>("query").context("missing query")?;
    let pipeline = Pipeline::new(&resolve_config(args)?).context("building pipeline")?;
    let outcome = pipeline.ask(query).context("running pipeline")?;

    if args.get_flag("json") {
        let value = outcome.state.to_value().context("serializing final state")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_outcome(&outcome, args.get_flag("trace"));
    }
    Ok(())
}

fn chat(args: &ArgMatches) -> Result<()> {
    let pipeline = Pipeline::new(&resolve_config(args)?).context("building pipeline")?;
    let session = uuid::Uuid::new_v4().to_string();
    tracing::info!("Chat session {}", session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        let outcome = pipeline.ask_in_session(&session, query).context("running pipeline")?;
        print_outcome(&outcome, false);
        writeln!(stdout)?;
    }
    eprintln!("session {session}: {} turns", pipeline.sessions().history(&session).len());
    Ok(())
}

/// Whether every dataset loaded cleanly
fn check_data(args: &ArgMatches) -> Result<bool> {
    let config = resolve_config(args)?;
    let data = DataAccess::new(Arc::new(JsonDirSource::new(config.data_dir.clone())));

    println!("data dir: {}", config.data_dir.display());
    let checks = data.check_all();
    for check in &checks {
        match &check.error {
            None => println!("  ok    {:<32} {:>6} rows {:>3} columns", check.dataset.file_stem(), check.rows, check.columns),
            Some(error) => println!("  FAIL  {:<32} {error}", check.dataset.file_stem()),
        }
    }

    let failed = checks.iter().filter(|c| !c.is_ok()).count();
    if failed > 0 {
        println!("{failed} dataset(s) failed");
    }
    Ok(failed == 0)
}

fn intents() {
    for (idx, rule) in RULES.iter().enumerate() {
        let groups: Vec<String> = rule
            .requires
            .iter()
            .map(|group| group.iter().map(|k| k.text()).collect::<Vec<_>>().join("|"))
            .collect();
        println!("{:>2}. {:<30} -> {:<30} [{}]", idx + 1, rule.name, rule.intent.as_str(), groups.join("] + ["));
    }
    println!("{:>2}. {:<30} -> general_question", RULES.len() + 1, k9_pipeline::intent::FALLBACK_RULE);
}

fn run(matches: &ArgMatches) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("ask", args)) => ask(args).map(|()| ExitCode::SUCCESS),
        Some(("chat", args)) => chat(args).map(|()| ExitCode::SUCCESS),
        Some(("check-data", args)) => {
            let ok = check_data(args)?;
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Some(("intents", _)) => {
            intents();
            Ok(ExitCode::SUCCESS)
        }
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn data_dir_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k9.toml");
        std::fs::write(&path, "data_dir = \"from-file\"\ncache_capacity = 2\n").unwrap();

        let matches = cli().get_matches_from(["k9", "ask", "hola", "--config", path.to_str().unwrap(), "--data-dir", "cli"]);
        let (_, args) = matches.subcommand().unwrap();
        let config = resolve_config(args).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("cli"));
        assert_eq!(config.cache_capacity, 2);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let matches = cli().get_matches_from(["k9", "check-data", "--config", "/no/such/k9.toml"]);
        let (_, args) = matches.subcommand().unwrap();
        let err = resolve_config(args).unwrap_err();
        assert!(format!("{err:#}").contains("loading configuration"));
    }

    #[test]
    fn check_data_passes_on_fixture_dir() {
        let dir = tempfile::tempdir().unwrap();
        k9_test_utils::write_scenario_dir(dir.path());
        let matches = cli().get_matches_from(["k9", "check-data", "--data-dir", dir.path().to_str().unwrap()]);
        let (_, args) = matches.subcommand().unwrap();
        assert!(check_data(args).unwrap());
    }

    #[test]
    fn check_data_fails_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let matches = cli().get_matches_from(["k9", "check-data", "--data-dir", dir.path().to_str().unwrap()]);
        let (_, args) = matches.subcommand().unwrap();
        assert!(!check_data(args).unwrap());
    }
}
