use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use webmind_common::Config;

use webmind_agent::judge::OllamaModel;
use webmind_agent::scraper::{
    BrowserlessFetcher, DdgSearcher, HttpFetcher, PageFetcher, SerperSearcher, WebSearcher,
};
use webmind_agent::session::{SearchSession, SessionOutcome, StatusSink};

#[derive(Parser)]
#[command(
    name = "webmind",
    about = "Answer a question by searching the web and judging each page with a local model"
)]
struct Cli {
    /// The question to answer
    query: String,

    /// Maximum number of result pages to try before giving up
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Maximum number of search results to request
    #[arg(long)]
    max_results: Option<usize>,

    /// Ask the model to explain the failure when no page sufficed
    #[arg(long)]
    summarize_failures: bool,
}

/// Streams progress to stderr so stdout stays clean for the answer.
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("webmind_agent=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    let max_attempts = cli.max_attempts.unwrap_or(config.max_attempts);
    let max_results = cli.max_results.unwrap_or(config.max_results);
    let summarize = cli.summarize_failures || config.summarize_failures;

    let searcher: Box<dyn WebSearcher> = match config.serper_api_key.as_deref() {
        Some(key) => Box::new(SerperSearcher::new(key)),
        None => Box::new(DdgSearcher::new()),
    };
    let fetcher: Box<dyn PageFetcher> = match config.browserless_url.as_deref() {
        Some(base_url) => Box::new(BrowserlessFetcher::new(
            base_url,
            config.browserless_token.as_deref(),
        )),
        None => Box::new(HttpFetcher::new()),
    };
    let model = Box::new(OllamaModel::new(&config.ollama_url, &config.chat_model));

    let sink = ConsoleSink;
    sink.notify(&format!(
        "Searching for top {max_results} results for: {}",
        cli.query
    ));
    let candidates: Vec<String> = searcher
        .search(&cli.query, max_results)
        .await?
        .into_iter()
        .map(|r| r.url)
        .collect();
    info!(count = candidates.len(), "Search complete");

    let session = SearchSession::new(fetcher, model, config.context_cap());
    let report = session
        .run(&cli.query, &candidates, max_attempts, &sink)
        .await?;

    println!("{}", report.outcome.message());

    if summarize {
        if let SessionOutcome::Exhausted { .. } = report.outcome {
            if let Some(summary) = session.summarize_failure(&cli.query, &report.tried_urls).await {
                println!("\n{summary}");
            }
        }
    }

    if !report.tried_urls.is_empty() {
        eprintln!("\nURLs tried:");
        for url in &report.tried_urls {
            eprintln!("- {url}");
        }
    }

    Ok(())
}
