use clap::{Arg, ArgMatches, Command};
use std::process;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod pipeline;
mod utils;

use config::{Config, DEFAULT_API_BASE, DEFAULT_MODEL};
use console::Console;
use pipeline::Pipeline;
use utils::openai_chat::ChatCompletionService;
use utils::pdf::PdfExtractSource;

fn cli() -> Command {
    Command::new("lay-summary")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Summarize a research PDF for a lay audience and self-evaluate the summary")
        .long_about(
            "Reads a PDF path from standard input, extracts the document text, asks an\n\
            OpenAI-compatible chat model for a lay summary (Purpose, Methods, Results,\n\
            Conclusion; under 150 words) and then asks the same model to check that\n\
            summary against the original text.\n\n\
            Requires OPENAI_API_KEY in the environment or in a .env file.",
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("ID")
                .env("OPENAI_MODEL")
                .help(format!("Chat model identifier [default: {}]", DEFAULT_MODEL))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("api-base")
                .long("api-base")
                .value_name("URL")
                .env("OPENAI_BASE_URL")
                .help(format!(
                    "Base URL of the chat completions API [default: {}]",
                    DEFAULT_API_BASE
                ))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors")
                .action(clap::ArgAction::SetTrue),
        )
}

// Logs go to stderr so stdout carries only the prompt and the report.
fn init_tracing(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = Config::from_env(
        matches.get_one::<String>("model").cloned(),
        matches.get_one::<String>("api-base").cloned(),
    )?;
    info!("API key retrieved successfully");
    debug!("Using configuration: {:?}", config);

    let client = ChatCompletionService::new(config.api_key.clone(), &config.api_base)?;
    debug!("Chat completions endpoint: {}", client.endpoint());
    let pipeline = Pipeline::new(PdfExtractSource::new(), client, config.model.clone());

    let mut console = Console::stdio();
    pipeline.run(&mut console).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    // Must precede argument parsing so .env values feed the env-backed flags.
    let dotenv = dotenvy::dotenv();

    let matches = cli().get_matches();
    init_tracing(matches.get_flag("quiet"));

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    }

    if let Err(e) = run(&matches).await {
        error!("{:#}", e);
        // Printed directly so the diagnostic survives any RUST_LOG filter.
        eprintln!("{}", diagnostic(&e));
        process::exit(1);
    }
}

fn diagnostic(err: &anyhow::Error) -> String {
    format!("Error: {:#}", err)
}
