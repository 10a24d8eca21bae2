//! Identity and balance commands.

use anyhow::{Context, Result};
use lobster_core::api::value_label;
use lobster_core::config::Config;

use super::{open_session, registered_session};

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn register(config: Config, name: &str) -> Result<()> {
    let mut session = open_session(config)?;
    let response = session.register(name).await?;

    println!("🦞 Registered as: {}", response.signer_id);
    println!("   Bot ID: {}", response.bot_id);
    println!("   License: {}", value_label(&response.assigned_license));
    if let Some(identity) = session.identity() {
        println!("   API key: {}", identity.masked_api_key());
    }
    if let Some(welcome) = response.welcome_message.filter(|m| !m.is_empty()) {
        println!("\n{welcome}");
    }
    Ok(())
}

pub async fn auth(config: Config) -> Result<()> {
    let mut session = registered_session(config)?;
    let auth = session.authenticate().await?;

    println!("✅ Authenticated as bot: {}", auth.bot_id);
    println!("   Avatar: {}", auth.assigned_avatar);
    println!("   Permissions: {}", auth.permissions.join(", "));
    println!(
        "   WebSocket: {}",
        auth.ws_endpoint.as_deref().unwrap_or("-")
    );
    Ok(())
}

pub async fn status(config: Config) -> Result<()> {
    let session = registered_session(config)?;
    let status = session.refresh_status().await.context("Status failed")?;

    println!("🦞 Bot Status: {}", status.bot_id);
    println!("   Registered: {}", yes_no(status.registered));
    println!("   Connected: {}", yes_no(status.connected));
    println!(
        "   License: {} ({})",
        status.license.tier,
        status.license.school.as_deref().unwrap_or("No school")
    );
    if let Some(avatar) = &status.avatar {
        println!("   Avatar: {avatar}");
    }
    if let Some(stats) = &status.stats {
        println!("   Quests completed: {}", stats.quests_completed);
        println!("   Tokens earned: {}", value_label(&stats.tokens_earned));
    }
    Ok(())
}

pub async fn wallet(config: Config) -> Result<()> {
    let session = registered_session(config)?;
    let wallet = session.api().wallet().await.context("Wallet failed")?;

    println!("💰 Wallet Balance\n");
    println!("   CC (Currency): {}", wallet.cc);
    println!("\n   Tokens:");
    for (token, amount) in &wallet.tokens {
        println!("      {}: {amount}", token.to_uppercase());
    }
    println!("\n   Seals:");
    for (seal, count) in &wallet.seals {
        println!("      {}: {count}", capitalize(seal));
    }
    println!("\n   Stats:");
    println!("      Verified works: {}", wallet.stats.verified_works);
    println!(
        "      Verifications: {}/{}",
        wallet.stats.correct_verifications, wallet.stats.total_verifications
    );
    Ok(())
}

/// Status summary without touching the live channel.
pub async fn check(config: Config) -> Result<()> {
    let session = registered_session(config)?;
    let status = session.refresh_status().await.context("Status failed")?;

    println!("Bot: {}", status.bot_id);
    println!("License: {}", status.license.tier);
    println!("CC: {}", status.wallet.cc);
    println!("ORE: {}", status.wallet.token("ore"));
    Ok(())
}
