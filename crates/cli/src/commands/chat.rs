//! `linksort chat`: Interactive or single-message chat mode.

use linksort_agent::{AgentLoop, AgentStreamEvent, DEFAULT_SYSTEM_PROMPT, live_channel, system_prompt};
use linksort_config::AppConfig;
use linksort_core::event::EventBus;
use linksort_core::message::{Conversation, Message};
use linksort_providers::AnthropicProvider;
use linksort_store::InMemoryStore;
use linksort_tools::{ToolContext, default_registry};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::seed;

/// Everything one terminal session needs between turns.
struct Session {
    agent: AgentLoop,
    ctx: ToolContext,
    base_prompt: String,
    conversation: Conversation,
    live_buffer: usize,
    publish_timeout: Duration,
}

pub async fn run(
    config: AppConfig,
    message: Option<String>,
    seed_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(api_key) = config.api_key.clone() else {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!("    export LINKSORT_API_KEY=sk-ant-...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    let assistant = &config.assistant;
    let provider = AnthropicProvider::new(api_key, Duration::from_secs(assistant.request_timeout_secs))?
        .with_base_url(&assistant.base_url);

    let store = Arc::new(InMemoryStore::new());
    let user = match &seed_path {
        Some(path) => seed::load(&store, path).await?,
        None => {
            let user = seed::default_user();
            store.put_user(user.clone()).await;
            user
        }
    };

    let ctx = ToolContext::new(user, store.clone(), store.clone());
    let tools = Arc::new(default_registry(ctx.clone()));
    let tool_names = tools.names().join(", ");
    let event_bus = Arc::new(EventBus::default());

    let agent = AgentLoop::new(Arc::new(provider), &assistant.model, tools, event_bus)
        .with_temperature(assistant.temperature)
        .with_max_tokens(assistant.max_tokens)
        .with_max_rounds(assistant.max_rounds)
        .with_store(store);

    let mut session = Session {
        agent,
        ctx,
        base_prompt: assistant
            .system_prompt_override
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        conversation: Conversation::new(),
        live_buffer: assistant.live_buffer,
        publish_timeout: Duration::from_millis(assistant.publish_timeout_ms),
    };

    if let Some(msg) = message {
        // Single message mode
        return session.turn(&msg).await;
    }

    // Interactive mode
    println!();
    println!("  Linksort Assistant (interactive mode)");
    println!();
    println!("  Model:     {}", assistant.model);
    println!("  Tools:     {tool_names}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit. Ctrl+C during a reply stops it.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if let Err(e) = session.turn(line).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

impl Session {
    /// Send one user message and stream the reply to the terminal.
    async fn turn(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        // Folder edits from earlier turns show up in the next prompt.
        let user = self.ctx.user().await;
        self.agent.set_system_prompt(system_prompt(&self.base_prompt, &user));

        let before = self.conversation.len();
        self.conversation.push(Message::user(text));

        let (live, rx) = live_channel(self.live_buffer, self.publish_timeout);
        let printer = tokio::spawn(print_events(rx));

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let result = self.agent.run(&mut self.conversation, live, &cancel).await;
        interrupt.abort();
        let _ = printer.await;

        match result {
            Ok(summary) => {
                tracing::debug!(
                    rounds = summary.rounds,
                    tool_calls = summary.tool_calls_made,
                    input_tokens = summary.usage.input_tokens,
                    output_tokens = summary.usage.output_tokens,
                    "Turn complete"
                );
                Ok(())
            }
            Err(e) => {
                // A turn that produced nothing leaves no dangling user message.
                if self.conversation.len() == before + 1 {
                    self.conversation.messages.truncate(before);
                }
                if e.is_cancelled() {
                    eprintln!("  [Stopped]");
                    return Ok(());
                }
                Err(e.into())
            }
        }
    }
}

async fn print_events(mut rx: mpsc::Receiver<AgentStreamEvent>) {
    let mut stdout = std::io::stdout();
    let mut mid_line = false;
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Chunk { content } => {
                if !mid_line {
                    print!("  Assistant > ");
                    mid_line = true;
                }
                print!("{content}");
                let _ = stdout.flush();
            }
            AgentStreamEvent::ToolCall { name, .. } => {
                if mid_line {
                    println!();
                    mid_line = false;
                }
                eprintln!("  [tool] {name}");
            }
            AgentStreamEvent::ToolResult { name, output, success, .. } => {
                if !success {
                    eprintln!("  [tool] {name} failed: {output}");
                }
            }
            AgentStreamEvent::Done { .. } | AgentStreamEvent::Error { .. } => {
                if mid_line {
                    println!();
                    mid_line = false;
                }
            }
        }
    }
}
