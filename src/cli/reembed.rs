//! CLI `reembed` command: fill in missing note vectors, or regenerate all of
//! them after an embedding model change.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use synapse::config::SynapseConfig;
use synapse::server::build_brain;

pub async fn reembed(config: &SynapseConfig, email: Option<&str>, all: bool) -> Result<()> {
    let user_id = match email {
        Some(email) => {
            let conn = super::open(config)?;
            Some(super::profile_id(&conn, email)?)
        }
        None => None,
    };

    let brain = build_brain(config.clone())?;
    anyhow::ensure!(
        brain.ai().name() != "disabled",
        "AI provider is disabled; set GEMINI_API_KEY or ai.api_key first"
    );

    println!("Embedding notes with model '{}'...", config.ai.embedding_model);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let report = brain
        .reembed(user_id, all, |done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        })
        .await?;
    pb.finish_and_clear();

    if report.embedded + report.failed == 0 {
        println!("Every note already has a vector.");
    } else {
        println!("Embedded {} note(s), {} failed.", report.embedded, report.failed);
    }
    if report.failed > 0 {
        println!("Re-run `synapse reembed` to retry the failures.");
    }
    Ok(())
}
