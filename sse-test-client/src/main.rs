use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

mod output;
mod scenarios;
mod sse_client;

use output::print_test_summary;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "Event stream integration testing tool")]
struct Cli {
    /// Base URL of the server (e.g., http://localhost:8080)
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Test scenario to run
    #[arg(long, value_enum, default_value = "global")]
    scenario: ScenarioChoice,

    /// Repository to watch for the repository scenario (format: owner/repo)
    #[arg(long, default_value = "rust-lang/rust")]
    repository: String,

    /// Seconds to wait for the first heartbeat ping
    #[arg(long, default_value_t = 15)]
    ping_timeout: u64,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Check the informational status endpoint only
    Status,
    /// Connect to the global stream
    Global,
    /// Connect to a repository stream
    Repository,
    /// Run all scenarios
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    if cli.repository.split('/').count() != 2 {
        anyhow::bail!("--repository must be in owner/repo form");
    }

    let base_url = cli.base_url.trim_end_matches('/').to_string();
    let ping_timeout = Duration::from_secs(cli.ping_timeout);
    let client = reqwest::Client::new();

    println!("{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::Status => {
            results.push(scenarios::test_server_status(&client, &base_url).await?);
        }
        ScenarioChoice::Global => {
            results.push(scenarios::test_global_stream(&base_url, ping_timeout).await?);
        }
        ScenarioChoice::Repository => {
            results.push(
                scenarios::test_repository_stream(&base_url, &cli.repository, ping_timeout)
                    .await?,
            );
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_server_status(&client, &base_url).await?);
            results.push(scenarios::test_global_stream(&base_url, ping_timeout).await?);
            results.push(
                scenarios::test_repository_stream(&base_url, &cli.repository, ping_timeout)
                    .await?,
            );
        }
    }

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
