use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use seele_agent::{ConversationDriver, ScheduledTaskTool, SearchMemoriesTool, ToolRegistry};
use seele_core::SeeleConfig;
use seele_llm::{EmbeddingClient, LlmClient, RerankerClient};
use seele_memory::MemoryManager;
use seele_profile::ProfileStore;
use seele_scheduler::SchedulerEngine;
use seele_store::Store;

#[derive(Parser, Debug)]
#[command(name = "seele", about = "Persistent-memory conversational agent core")]
struct Args {
    /// Path to the profile's TOML config file.
    #[arg(short, long, default_value = "seele.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "seele=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = SeeleConfig::load(&args.config).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        SeeleConfig::default()
    });

    let data_dir = PathBuf::from(&config.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let store = Arc::new(Store::open(
        data_dir.join("seele.db").to_str().expect("data_dir must be valid UTF-8"),
    )?);
    let profile = ProfileStore::new(data_dir.join("seele.json"));

    let timeout = Duration::from_millis(config.llm.timeout_ms);
    let llm = Arc::new(LlmClient::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.chat_model.clone(),
        config.llm.tool_model.clone(),
        config.llm.chat_reasoning_effort.clone(),
        config.llm.tool_reasoning_effort.clone(),
        timeout,
    ));
    let embedding = EmbeddingClient::new(
        config
            .embedding
            .base_url
            .clone()
            .unwrap_or_else(|| config.llm.base_url.clone()),
        config.embedding.api_key.clone().unwrap_or_else(|| config.llm.api_key.clone()),
        config.embedding.model.clone(),
        config.embedding.dimension,
        timeout,
    );
    let reranker = RerankerClient::new(
        config.rerank.base_url.clone(),
        config.rerank.api_key.clone(),
        config.rerank.model.clone(),
        timeout,
    );

    let memory = Arc::new(MemoryManager::new(&config, store.clone(), profile, llm.clone(), embedding, reranker));
    memory.restore_or_start_session().await?;
    info!(session_id = memory.session_id(), "session ready");

    let tools = Arc::new(ToolRegistry::new(vec![
        Box::new(ScheduledTaskTool::new(store.clone(), config.timezone.clone())) as Box<dyn seele_agent::Tool>,
        Box::new(SearchMemoriesTool::new(store.clone(), memory.clone(), config.timezone.clone(), 10))
            as Box<dyn seele_agent::Tool>,
    ]));

    let driver = Arc::new(ConversationDriver::new(
        memory.clone(),
        llm.clone(),
        tools.clone(),
        config.session.new_session_command.clone(),
        config.session.reset_session_command.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = SchedulerEngine::new(store.clone(), driver.clone());
    let bootstrap_path = data_dir.join("scheduled_tasks.json");
    if let Err(e) = scheduler.bootstrap_from_file(&bootstrap_path) {
        warn!("scheduled task bootstrap failed: {e}");
    }
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    let repl = tokio::spawn(run_repl(driver));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
        result = repl => {
            result??;
        }
    }

    let _ = shutdown_tx.send(true);
    scheduler_handle.await?;
    Ok(())
}

/// Minimal REPL-style local chat loop over stdin/stdout, so the core is
/// exercisable without a transport.
async fn run_repl(driver: Arc<ConversationDriver>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        match driver.handle_turn(&line).await {
            Ok(reply) => {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            Err(e) => {
                warn!("turn failed: {e}");
                stdout.write_all(format!("error: {e}\n").as_bytes()).await?;
            }
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
