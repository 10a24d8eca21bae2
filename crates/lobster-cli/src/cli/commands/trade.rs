//! Commands that spend or earn currency.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use lobster_core::api::{Artifact, ImprovementRequest, SubmitRequest, value_label};
use lobster_core::config::Config;

use super::registered_session;

pub struct SubmitOptions<'a> {
    pub config: Config,
    pub quest_id: &'a str,
    pub artifacts: &'a [PathBuf],
    /// `;`-separated.
    pub claims: Option<&'a str>,
    /// `,`-separated.
    pub tokens: Option<&'a str>,
}

pub struct ImprovementOptions<'a> {
    pub config: Config,
    pub stall_id: &'a str,
    pub improvement_type: &'a str,
    pub description: &'a str,
    pub artifacts: &'a [PathBuf],
    /// `;`-separated.
    pub claims: Option<&'a str>,
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_artifact(path: &Path) -> Result<Artifact> {
    if !path.is_file() {
        return Err(anyhow!("Artifact not found: {}", path.display()));
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("read artifact {}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(Artifact::new(name, content))
}

/// Reads each named file, and every regular file directly inside each named
/// directory (sorted by name).
fn collect_artifacts(paths: &[PathBuf]) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for path in paths {
        if !path.is_dir() {
            artifacts.push(read_artifact(path)?);
            continue;
        }
        let entries = fs::read_dir(path)
            .with_context(|| format!("read artifact directory {}", path.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.with_context(|| format!("read artifact directory {}", path.display()))?;
            let file = entry.path();
            if file.is_file() {
                files.push(file);
            }
        }
        files.sort();
        for file in &files {
            artifacts.push(read_artifact(file)?);
        }
    }
    if artifacts.is_empty() {
        bail!("No artifact files found");
    }
    Ok(artifacts)
}

pub async fn submit(options: SubmitOptions<'_>) -> Result<()> {
    let SubmitOptions {
        config,
        quest_id,
        artifacts,
        claims,
        tokens,
    } = options;
    let session = registered_session(config)?;

    let artifacts = collect_artifacts(artifacts)?;
    let request = SubmitRequest {
        quest_id: quest_id.to_string(),
        artifacts,
        claims: claims.map(|raw| split_list(raw, ';')).unwrap_or_default(),
        requested_tokens: tokens.map(|raw| split_list(raw, ',')),
    };

    let response = session
        .api()
        .submit(&request)
        .await
        .context("Submission failed")?;

    println!("✅ Work submitted!");
    println!("   Submission ID: {}", response.submission_id);
    println!("   Status: {}", response.status);
    println!("\n   Verification jobs created:");
    for job in &response.verification_jobs {
        println!(
            "      [{}] {} - {} CC (stake: {} CC)",
            job.id, job.kind, job.pay_cc, job.stake_cc
        );
    }
    if let Some(message) = response.message.filter(|m| !m.is_empty()) {
        println!("\n{message}");
    }
    Ok(())
}

pub async fn improve(options: ImprovementOptions<'_>) -> Result<()> {
    let ImprovementOptions {
        config,
        stall_id,
        improvement_type,
        description,
        artifacts,
        claims,
    } = options;
    let session = registered_session(config)?;

    let request = ImprovementRequest {
        stall_id: stall_id.to_string(),
        improvement_type: improvement_type.to_string(),
        description: description.to_string(),
        artifacts: collect_artifacts(artifacts)?,
        claims: claims.map(|raw| split_list(raw, ';')).unwrap_or_default(),
    };
    let count = request.artifacts.len();

    let response = session
        .api()
        .submit_improvement(&request)
        .await
        .context("Improvement failed")?;

    println!("✅ Improvement submitted for {stall_id} ({count} artifacts)");
    if let Some(id) = &response.improvement_id {
        println!("   Improvement ID: {id}");
    }
    if let Some(status) = &response.status {
        println!("   Status: {status}");
    }
    if let Some(message) = response.message.filter(|m| !m.is_empty()) {
        println!("\n{message}");
    }
    Ok(())
}

pub async fn task(config: Config, task_id: &str) -> Result<()> {
    let session = registered_session(config)?;
    let result = session.complete_task(task_id).await.context("Failed")?;

    println!("✅ Task completed: {task_id}");
    println!("   Earned: {} CC", result.earned_cc);
    println!("   New balance: {} CC", result.balance);
    Ok(())
}

pub async fn craft(config: Config, recipe: &str) -> Result<()> {
    let session = registered_session(config)?;
    let result = session.api().craft(recipe).await.context("Failed")?;

    println!("🔨 Crafted successfully!");
    println!("   Recipe: {recipe}");
    println!("   Output: {}", value_label(&result.crafted));
    println!("   Cost: {}", value_label(&result.cost));
    println!("\n   Balance:");
    println!("      CC: {}", result.balance.cc);
    for (token, amount) in &result.balance.tokens {
        println!("      {}: {amount}", token.to_uppercase());
    }
    Ok(())
}

pub async fn upgrade(config: Config, license: &str, school: Option<&str>) -> Result<()> {
    let session = registered_session(config)?;
    let result = match session.api().upgrade_license(license, school).await {
        Ok(result) => result,
        Err(err) => {
            let schools = err.payload_strings("available_schools");
            if schools.is_empty() {
                return Err(anyhow::Error::new(err).context("Failed"));
            }
            return Err(
                anyhow!("{err}\n   Available schools: {}", schools.join(", ")).context("Failed"),
            );
        }
    };

    println!("🎉 License upgraded!");
    println!("   New tier: {}", result.new_license.tier);
    if let Some(school) = &result.new_license.school {
        println!("   School: {school}");
    }
    println!("   Remaining CC: {}", result.balance.cc);
    Ok(())
}
