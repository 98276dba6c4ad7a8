//! `stratachat chat` — Interactive or single-message chat mode.

use std::io::Write;

use stratachat_config::AppConfig;
use stratachat_engine::ChatEngine;

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // No key means no remote providers; the local fallback still answers,
    // so warn instead of refusing to start.
    if config.api_key.is_none() && config.providers.iter().all(|p| p.api_key.is_none()) {
        eprintln!();
        eprintln!("  WARNING: No API key configured — only the local fallback will answer.");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY   (recommended)");
        eprintln!("    OPENAI_API_KEY");
        eprintln!("    ANTHROPIC_API_KEY");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
    }

    let engine = ChatEngine::from_config(&config)?;
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = engine.chat(&session_id, &msg).await;
        eprint!("\r              \r");
        let reply = reply?;
        println!("{}", reply.text);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       StrataChat — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Session:   {session_id}");
    println!("  Fast:      {} provider(s)", config.providers_in_tier("fast").len());
    println!("  Mid:       {} provider(s)", config.providers_in_tier("mid").len());
    println!("  Reasoning: {} provider(s)", config.providers_in_tier("reasoning").len());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        eprint!("  ...");
        match engine.chat(&session_id, line).await {
            Ok(reply) => {
                eprint!("\r     \r");
                println!();
                for text_line in reply.text.lines() {
                    println!("  Assistant > {text_line}");
                }
                println!();
                println!(
                    "  [{} / {} | {} attempt(s) | {} tokens | ~{} memory tokens]",
                    reply.provider,
                    reply.model,
                    reply.attempts.len(),
                    reply.tokens,
                    reply.memory_tokens
                );
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}
