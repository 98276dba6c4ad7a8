//! `stratachat status` — Show configuration status.

use stratachat_config::AppConfig;
use stratachat_ledger::PricingTable;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("StrataChat Status");
    println!("=================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  API key:       {}", if config.api_key.is_some() { "configured" } else { "not set" });
    println!("  Temperature:   {}", config.default_temperature);
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!("  Hot budget:    {} tokens", config.memory.hot_budget_tokens);
    println!("  Keep recent:   {} turns", config.memory.keep_recent_turns);
    println!("  Recall:        top {} (min score {})", config.memory.recall_limit, config.memory.recall_min_score);
    println!("  Embedding:     {} ({})", config.embedding.provider, config.embedding.model);

    for tier in ["fast", "mid", "reasoning"] {
        let entries = config.providers_in_tier(tier);
        if entries.is_empty() {
            println!("  {tier:<12}   (none)");
        } else {
            for entry in entries {
                println!("  {tier:<12}   {} / {}", entry.name, entry.model);
            }
        }
    }
    println!("  guaranteed     local / local-fallback");

    let pricing = PricingTable::from_config(&config);
    println!("  Pricing:       {} models known", pricing.len());

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `stratachat onboard` first");
    }

    Ok(())
}
