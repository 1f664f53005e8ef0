//! Pocket Agent - LLM-driven phone UI automation
//!
//! This is the main entry point for the pocket-agent CLI tool.

use pocket_agent::{
    Agent, AgentConfig, AgentRuntime, AppSettings, DryRunExecutor, IngestMessage, LogNotifier,
    ModelConfig, ProviderKind,
};
use std::env;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Persisted settings, overridable from the environment
    let mut settings = AppSettings::load();
    if let Ok(provider) = env::var("MODEL_PROVIDER") {
        settings.provider = provider;
    }
    if let Ok(key) = env::var("MODEL_API_KEY") {
        settings.api_key = key;
    }
    if let Ok(model) = env::var("MODEL_NAME") {
        settings.model = model;
    }
    if let Ok(steps) = env::var("AGENT_MAX_STEPS") {
        if let Ok(steps) = steps.parse() {
            settings.max_steps = steps;
        }
    }

    let provider: ProviderKind = settings
        .provider
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let mut model_config =
        ModelConfig::new(provider, "").with_timeout(settings.request_timeout_secs);
    if !settings.model.is_empty() {
        model_config = model_config.with_model(&settings.model);
    }

    println!("🤖 Pocket Agent - LLM-driven Phone Automation");
    println!("================================================");
    println!("Provider: {:?}", provider);
    println!("Model: {}", model_config.model);
    println!("Max steps: {}", settings.max_steps);
    if settings.api_key.is_empty() {
        println!("API key: not set (use /key <key> to install one)");
    }
    println!("================================================\n");

    let agent_config = AgentConfig::default().with_max_steps(settings.max_steps);
    let agent = Agent::new(DryRunExecutor::new(), LogNotifier, agent_config);
    let runtime = AgentRuntime::new(agent, model_config);

    let (tx, rx) = mpsc::channel(32);
    let runtime_handle = tokio::spawn(runtime.run(rx));

    if !settings.api_key.is_empty() {
        tx.send(IngestMessage::Credential(settings.api_key.clone()))
            .await?;
    }

    println!("Type a task and press Enter.");
    println!("Commands: /key <api-key>, /reply <text>, quit\n");

    let stdin = io::stdin();
    loop {
        print!("📝 Task: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "exit" {
            println!("Goodbye! 👋");
            break;
        }

        if let Some(key) = input.strip_prefix("/key ") {
            let key = key.trim().to_string();
            settings.api_key = key.clone();
            if let Err(e) = settings.save() {
                tracing::warn!(error = %e, "failed to persist settings");
            }
            tx.send(IngestMessage::Credential(key)).await?;
            continue;
        }

        if let Some(reply) = input.strip_prefix("/reply ") {
            tx.send(IngestMessage::QuickReply(reply.trim().to_string()))
                .await?;
            continue;
        }

        tx.send(IngestMessage::Prompt(input.to_string())).await?;
    }

    drop(tx);
    runtime_handle.await?;

    Ok(())
}
