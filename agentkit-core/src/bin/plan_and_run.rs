//! Plan-and-run fixture
//!
//! Drives one full plan -> execute -> summarize cycle against live APIs
//! without any surrounding application.
//!
//! Usage:
//!   OPENAI_API_KEY="sk-..." \
//!   AGENT_GOAL="Find out what people are saying about open-source AI tools" \
//!   cargo run --bin plan_and_run

use agentkit_core::{Config, Orchestrator, tools};
use std::collections::BTreeSet;
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let goal = env::args().nth(1).or_else(|| env::var("AGENT_GOAL").ok()).unwrap_or_else(|| {
        eprintln!("No goal given (argv or AGENT_GOAL). Using default.");
        "Find out what people are saying about open-source AI tools.".to_string()
    });

    let config = Config::from_env();

    let model = agentkit_core::OpenAIClient::new(
        &config.openai_api_key,
        config.openai_endpoint.as_deref(),
        Some(&config.model),
    )
    .unwrap_or_else(|e| {
        eprintln!("Failed to create model client: {}", e);
        std::process::exit(1);
    })
    .with_max_tokens(config.max_tokens);

    let registry = Arc::new(tools::create_default_registry(&config.tools));
    let enabled: BTreeSet<String> = registry.names().into_iter().collect();

    println!("Goal: {}", goal);
    println!(
        "Enabled tools: {}",
        enabled.iter().cloned().collect::<Vec<_>>().join(", ")
    );

    // Ctrl-C cancels the cycle: planning aborts outright, in-flight tool
    // calls are interrupted.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            signal_token.cancel();
        }
    });

    let orchestrator = Orchestrator::new(Arc::new(model), registry);

    match orchestrator.run_cycle(&goal, &enabled, &cancel).await {
        Ok(cycle) => {
            println!("\nPlan ({} steps):", cycle.plan.len());
            for (index, step) in cycle.plan.steps.iter().enumerate() {
                println!("  {}. {} <- {:?}", index + 1, step.tool, step.input);
            }

            println!("\nExecution:");
            for result in &cycle.report.results {
                match &result.error {
                    None => println!(
                        "  [ok]   {} ({} bytes, {}ms)",
                        result.step.tool,
                        result.output.len(),
                        result.duration_ms
                    ),
                    Some(error) => {
                        println!("  [err]  {} ({}ms): {}", result.step.tool, result.duration_ms, error)
                    }
                }
            }

            println!("\nSummary:\n{}", cycle.summary);
        }
        Err(e) => {
            eprintln!("\nCycle failed during {}: {}", e.stage(), e);
            std::process::exit(1);
        }
    }
}
