use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use job_search_kernel::{CredentialStore, Settings};
use job_search_router::{AnthropicProvider, Provider};
use tracing::debug;

use crate::search::{self, JobSearch, SearchQuery};

/// Interactive search: ensure a key, then ask for keywords and location
/// until the operator declines another search.
///
/// Prompts go to stderr so stdout carries only results.
pub async fn execute(config_dir: &Path) -> Result<()> {
    let store = CredentialStore::new(config_dir);
    let settings = Settings::load(config_dir).context("failed to load settings")?;
    debug!(config_dir = %config_dir.display(), model = %settings.model, "loaded settings");

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut prompts = std::io::stderr();

    let api_key = store
        .get_or_prompt(&mut input, &mut prompts)
        .with_context(|| format!("failed to save API key to {}", store.path().display()))?;
    let Some(api_key) = api_key else {
        bail!("API key is required to search for jobs.");
    };

    let provider = AnthropicProvider::with_base_url(api_key, settings.base_url.clone());
    let job_search = JobSearch::new(provider, &settings);

    run(&job_search, &mut input, &mut prompts, &mut std::io::stdout()).await
}

/// The prompt/search/repeat loop, over arbitrary streams.
pub async fn run<P: Provider>(
    job_search: &JobSearch<P>,
    input: &mut impl BufRead,
    prompts: &mut impl Write,
    out: &mut impl Write,
) -> Result<()> {
    let sep = search::separator();
    writeln!(prompts, "\n{sep}")?;
    writeln!(prompts, "{:^width$}", "JOB SEARCH TOOL", width = search::SEPARATOR_WIDTH)?;
    writeln!(prompts, "{sep}")?;

    loop {
        writeln!(prompts, "\nEnter job search details:")?;
        let keywords = ask(
            input,
            prompts,
            "Job keywords (e.g., 'software engineer', 'data analyst'): ",
        )?;
        let location = ask(
            input,
            prompts,
            "Location (e.g., 'San Francisco', 'Remote', 'New York'): ",
        )?;

        let Some(query) = SearchQuery::new(&keywords, &location) else {
            bail!("Both keywords and location are required!");
        };

        writeln!(
            prompts,
            "\nSearching for '{}' jobs near {}...\n",
            query.keywords, query.location
        )?;

        let outcome = job_search.search(&query).await?;
        search::render(&outcome, out)?;
        debug!(
            web_searches = outcome.web_search_requests,
            tokens = outcome.total_tokens,
            cost = outcome.cost,
            "search complete"
        );

        writeln!(prompts, "\n{sep}")?;
        let again = ask(input, prompts, "\nSearch again? (y/n): ")?;
        if !matches!(again.to_lowercase().as_str(), "y" | "yes") {
            break;
        }
    }

    writeln!(prompts, "\nThank you for using Job Search Tool!")?;
    Ok(())
}

/// Show `prompt` and read one trimmed line. EOF reads as an empty answer.
fn ask(input: &mut impl BufRead, prompts: &mut impl Write, prompt: &str) -> Result<String> {
    write!(prompts, "{prompt}")?;
    prompts.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}
