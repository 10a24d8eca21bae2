//! Read-only world commands. None of them need credentials.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use lobster_core::api::{QuestFilter, value_label};
use lobster_core::config::Config;
use lobster_core::world::WorldSnapshot;

use super::open_session;

const DESCRIPTION_PREVIEW: usize = 100;

pub async fn stalls(config: Config) -> Result<()> {
    let session = open_session(config)?;
    let response = session.api().stalls().await.context("Failed")?;

    println!("🏪 Available Stalls:\n");
    for stall in &response.stalls {
        println!("  [{}] {}", stall.id, stall.name);
        println!("      Fantasy: {}", stall.fantasy);
        println!("      Reality: {}", stall.real_work);
        if let Some(school) = &stall.school {
            println!("      School: {school}");
        }
        println!();
    }
    Ok(())
}

pub async fn stall(config: Config, stall_id: &str) -> Result<()> {
    let session = open_session(config)?;
    let info = session
        .api()
        .stall(stall_id)
        .await
        .with_context(|| format!("Failed to load stall {stall_id}"))?;

    println!("🔨 {}\n", info.stall_name);
    println!("Fantasy: {}", info.fantasy);
    println!("Reality: {}", info.real_work);

    if let Some(instructions) = &info.skill_instructions {
        println!(
            "\n📋 Instructions (v{}):",
            value_label(&instructions.version)
        );
        println!("   {}", instructions.description);

        if !instructions.artifact_format.is_empty() {
            println!("\n📄 Required Artifacts:");
            for (name, spec) in &instructions.artifact_format {
                let req = if spec.required { "(required)" } else { "(optional)" };
                println!("   - {name} {req}: {}", spec.description);
            }
        }
        if !instructions.checklist.is_empty() {
            println!("\n✅ Checklist:");
            for item in &instructions.checklist {
                println!("   • {item}");
            }
        }
    }

    if !info.available_quests.is_empty() {
        println!("\n📜 Available Quests ({}):", info.available_quests.len());
        for quest in &info.available_quests {
            println!("   [{}] {}", quest.quest_id, quest.title);
            println!("      Reward: {}", quest.reward_label());
        }
    }
    Ok(())
}

pub async fn quests(config: Config, stall: Option<String>, status: String) -> Result<()> {
    let session = open_session(config)?;
    let filter = QuestFilter {
        stall,
        status: Some(status),
    };
    let response = session.api().quests(&filter).await.context("Failed")?;

    if response.quests.is_empty() {
        println!("No quests found.");
        return Ok(());
    }

    println!("📜 Quests ({}):\n", response.quests.len());
    for quest in &response.quests {
        println!("  [{}] {}", quest.quest_id, quest.title);
        println!("      Stall: {}", quest.stall);
        println!("      Reward: {}", quest.reward_label());
        println!("      Status: {}", quest.status);
        println!("      Deadline: {}", value_label(&quest.deadline));
        println!("      Description: {}", preview(&quest.description));
        println!();
    }
    Ok(())
}

fn preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_PREVIEW).collect();
    format!("{cut}...")
}

/// Checks the server answers by reading the public world state.
pub async fn test(config: Config) -> Result<()> {
    let session = open_session(config)?;
    println!("Testing connection to {}...", session.api().base_url());

    let response = session
        .api()
        .world_state()
        .await
        .context("Connection failed")?;
    let snapshot = WorldSnapshot::from(response.state);

    println!("✅ Connected!");
    println!("   Avatars: {}", snapshot.avatar_count);
    println!("   Bots online: {}", snapshot.bot_count);
    println!("   Game time: {}", snapshot.clock);
    println!(
        "   Build Night: {}",
        if snapshot.build_night { "Yes" } else { "No" }
    );
    Ok(())
}

pub async fn economy(config: Config) -> Result<()> {
    let session = open_session(config)?;
    let economy = session.api().economy().await.context("Failed")?;

    println!("📊 LobsterFoundry Economy\n");

    println!("=== Basic Tasks (Earn CC) ===");
    for (task, info) in &economy.basic_tasks {
        let cooldown = info
            .cooldown_hours
            .map(|hours| format!(", cooldown: {hours}h"))
            .unwrap_or_default();
        let once = if info.once { " (one-time)" } else { "" };
        println!("   {task}: +{} CC{cooldown}{once}", info.reward);
    }

    println!("\n=== Stall Costs ===");
    for (stall, costs) in &economy.stall_costs {
        println!("   {stall}: {}", costs.summary());
    }

    println!("\n=== Crafting Recipes ===");
    for (recipe, info) in &economy.recipes {
        let amounts = |items: &BTreeMap<String, i64>| {
            items
                .iter()
                .map(|(item, count)| format!("{count} {item}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "   {recipe}: {} + {} CC → {} (requires {})",
            amounts(&info.inputs),
            info.fee,
            amounts(&info.output),
            info.min_license
        );
    }

    println!("\n=== License Requirements ===");
    for (tier, requirement) in &economy.license_requirements {
        println!("   {tier}: {}", requirement.summary());
    }
    Ok(())
}
