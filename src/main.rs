use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloudqa::utils::{build_orchestrator, build_source_clients, ensure_directory, get_log_path, open_catalog};
use cloudqa::orchestrator::failure_message;
use cloudqa::{AppConfig, ConfigError, Orchestrator};
use tracing_subscriber::EnvFilter;

/// cloudqa - ask questions about data spread across S3 and Azure
#[derive(Parser, Debug)]
#[command(name = "cloudqa")]
#[command(about = "Natural-language questions over S3 and Azure datasets")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Question to answer once and exit
    #[arg(value_name = "QUESTION", trailing_var_arg = true)]
    question: Vec<String>,

    /// Print the execution plan and every step result before the answer
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask questions interactively until `exit` or `quit`
    Repl {
        #[arg(short, long)]
        verbose: bool,
    },
    /// Seed side-car metadata for every object in every configured source
    Scan,
    /// List known side-car records
    Catalog {
        /// Only records whose path starts with this prefix
        #[arg(value_name = "PREFIX", default_value = "")]
        prefix: String,
    },
    /// Open the terminal chat interface
    Tui,
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let tui_mode = matches!(cli.command, Some(Commands::Tui));
    if let Err(e) = init_tracing(tui_mode) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = AppConfig::from_env()
        .context("Invalid configuration")
        .and_then(|config| dispatch(&cli, &config));

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn init_tracing(tui_mode: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cloudqa=info"));

    if tui_mode {
        let log_path = get_log_path()?;
        if let Some(parent) = log_path.parent() {
            ensure_directory(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// User errors are bad input or bad configuration; everything else is
/// internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<ConfigError>().is_some()
        || error.to_string().contains("cannot be empty")
}

fn dispatch(cli: &Cli, config: &AppConfig) -> Result<()> {
    match &cli.command {
        Some(Commands::Repl { verbose }) => handle_repl(config, *verbose || cli.verbose),
        Some(Commands::Scan) => handle_scan(config),
        Some(Commands::Catalog { prefix }) => handle_catalog(config, prefix),
        Some(Commands::Tui) => {
            let orchestrator = build_orchestrator(config)?;
            cloudqa::tui::run(orchestrator).context("TUI failed")
        }
        None if cli.question.is_empty() => handle_repl(config, cli.verbose),
        None => handle_ask(config, &cli.question.join(" "), cli.verbose),
    }
}

fn handle_ask(config: &AppConfig, question: &str, verbose: bool) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("Question cannot be empty");
    }
    let orchestrator = build_orchestrator(config)?;
    println!("{}", ask(&orchestrator, question, verbose));
    Ok(())
}

/// Answers one question, optionally prefixed by the plan and step results.
fn ask(orchestrator: &Orchestrator, question: &str, verbose: bool) -> String {
    if !verbose {
        return orchestrator.answer(question);
    }
    match orchestrator.run(question) {
        Ok(report) => {
            let mut out = format!("Plan:\n{}\n", report.plan);
            for result in &report.results {
                out.push_str(&format!("{result}\n\n"));
            }
            out.push_str(&format!("Answer:\n{}", report.answer));
            out
        }
        Err(e) => failure_message(&e),
    }
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}

fn handle_repl(config: &AppConfig, verbose: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\nAsk a question (or 'exit'): ");
        stdout.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read input")? == 0 {
            break;
        }
        if is_quit(&line) {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        println!("\n{}", ask(&orchestrator, question, verbose));
    }
    Ok(())
}

fn handle_scan(config: &AppConfig) -> Result<()> {
    let llm = config
        .llm_client()
        .context("Failed to configure language model client")?;
    for client in build_source_clients(config, llm)? {
        let container = client.config().container.clone();
        let summary = client
            .scan()
            .with_context(|| format!("Failed to scan {container}"))?;
        println!(
            "{} {}: {} scanned, {} already scanned, {} failed",
            client.config().source,
            container,
            summary.scanned,
            summary.already_scanned,
            summary.failed
        );
    }
    Ok(())
}

fn handle_catalog(config: &AppConfig, prefix: &str) -> Result<()> {
    let store = open_catalog(config)?;
    let records = store.list_all(prefix);
    if records.is_empty() {
        println!("No side-car records found.");
        return Ok(());
    }
    for record in records {
        let description = if record.description.is_empty() {
            "(no description)"
        } else {
            record.description.as_str()
        };
        println!(
            "[{}] {} ({} bytes, {})\n    {}",
            record.source, record.path, record.size_bytes, record.content_type, description
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_words_form_a_question() {
        let cli = Cli::try_parse_from(["cloudqa", "total", "sales", "by", "region"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.question.join(" "), "total sales by region");
    }

    #[test]
    fn verbose_flag_with_question() {
        let cli = Cli::try_parse_from(["cloudqa", "-v", "how", "many?"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.question, vec!["how", "many?"]);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["cloudqa", "catalog", "sales/"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Catalog { ref prefix }) if prefix == "sales/"));

        let cli = Cli::try_parse_from(["cloudqa", "catalog"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Catalog { ref prefix }) if prefix.is_empty()));

        let cli = Cli::try_parse_from(["cloudqa", "repl", "--verbose"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Repl { verbose: true })));

        assert!(matches!(
            Cli::try_parse_from(["cloudqa", "scan"]).unwrap().command,
            Some(Commands::Scan)
        ));
        assert!(matches!(
            Cli::try_parse_from(["cloudqa", "tui"]).unwrap().command,
            Some(Commands::Tui)
        ));
    }

    #[test]
    fn quit_keywords_end_repl() {
        assert!(is_quit("exit\n"));
        assert!(is_quit("  QUIT "));
        assert!(!is_quit("quit smoking stats"));
    }

    #[test]
    fn config_and_empty_question_are_user_errors() {
        let err = anyhow::Error::new(ConfigError::NoDataDir).context("Invalid configuration");
        assert!(is_user_error(&err));
        assert!(is_user_error(&anyhow::anyhow!("Question cannot be empty")));
        assert!(!is_user_error(&anyhow::anyhow!("TUI failed")));
    }
}
