//! CLI binary for darkweb-search.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use onion_search::{SearchConfig, SearchReport, SearchStatus, SourceId};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit code when every source failed because the proxy was unreachable.
const EXIT_PROXY_UNREACHABLE: u8 = 2;

/// darkweb-search: boolean search across onion search engines over Tor.
#[derive(Parser)]
#[command(name = "darkweb-search", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "DARKWEB_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run one query against the selected engines.
    Search(SearchArgs),

    /// List the built-in engines and whether they are enabled.
    Engines,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Query, with optional AND / OR / NOT operators and quoted phrases.
    #[arg(required = true)]
    query: Vec<String>,

    /// Comma-separated engines to query, or `all`.
    #[arg(short, long, value_delimiter = ',')]
    engines: Vec<String>,

    /// Query engines one after another instead of in parallel.
    #[arg(long)]
    sequential: bool,

    /// Give up on engines still running after this many seconds.
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// SOCKS proxy port, overriding the configuration file.
    #[arg(long)]
    proxy_port: Option<u16>,

    /// Print results as JSON instead of a numbered list.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout stays clean for results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("darkweb_search=info,onion_search=info,reqwest=warn,hyper=warn")
        }))
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => SearchConfig::default(),
    };

    match cli.command {
        Command::Search(args) => run_search(config, args).await,
        Command::Engines => {
            list_engines(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read a TOML settings file. Missing keys keep their defaults.
fn load_config(path: &Path) -> anyhow::Result<SearchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SearchConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Expand `all` and drop blanks; an empty list means the default engine.
fn resolve_engines(requested: &[String]) -> Vec<String> {
    if requested.iter().any(|e| e.trim().eq_ignore_ascii_case("all")) {
        return SourceId::all().iter().map(|id| id.name().to_owned()).collect();
    }
    requested
        .iter()
        .map(|e| e.trim().to_owned())
        .filter(|e| !e.is_empty())
        .collect()
}

fn apply_overrides(config: &mut SearchConfig, args: &SearchArgs) {
    if args.sequential {
        config.concurrent = false;
    }
    if let Some(secs) = args.deadline {
        config.search_deadline_secs = Some(secs);
    }
    if let Some(port) = args.proxy_port {
        config.proxy.port = port;
    }
}

async fn run_search(mut config: SearchConfig, args: SearchArgs) -> anyhow::Result<ExitCode> {
    apply_overrides(&mut config, &args);

    let query = args.query.join(" ");
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    let engines = resolve_engines(&args.engines);
    let engine_refs: Vec<&str> = engines.iter().map(String::as_str).collect();

    info!(engines = ?engine_refs, proxy = %config.proxy.socks_url(), "starting search");
    let report = onion_search::search(&query, &engine_refs, &config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.results.ranked())?);
    } else {
        print_report(&report);
    }

    match report.status() {
        SearchStatus::ProxyUnreachable => {
            eprintln!(
                "Could not reach the Tor SOCKS proxy at {}:{}. Is Tor running?",
                config.proxy.host, config.proxy.port
            );
            Ok(ExitCode::from(EXIT_PROXY_UNREACHABLE))
        }
        SearchStatus::Found(_) | SearchStatus::NothingFound => Ok(ExitCode::SUCCESS),
    }
}

fn print_report(report: &SearchReport) {
    for failure in &report.failures {
        eprintln!("  [{}] failed: {}", failure.source, failure.error);
    }

    match report.status() {
        SearchStatus::Found(count) => {
            println!("{count} result(s):\n");
            for (i, result) in report.results.ranked().into_iter().enumerate() {
                let sources = report.results.sources_for(&result.url).join(", ");
                println!("{:>3}. {}", i + 1, result.display_title());
                println!("     {}", result.url);
                println!("     source: {sources}");
                if let Some(description) = &result.description {
                    println!("     {description}");
                }
                println!();
            }
        }
        SearchStatus::NothingFound => println!("No results found."),
        SearchStatus::ProxyUnreachable => {}
    }
}

fn list_engines(config: &SearchConfig) {
    for id in SourceId::all() {
        let settings = config.sources.get(*id);
        let marker = if id.name() == config.default_source {
            " (default)"
        } else {
            ""
        };
        let state = if settings.enabled { "enabled" } else { "disabled" };
        println!("{:<12} {:<9} {}{marker}", id.name(), state, id.description());
    }
}
