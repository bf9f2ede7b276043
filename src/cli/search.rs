//! CLI `search` command.

use anyhow::Result;

use synapse::config::SynapseConfig;
use synapse::server::build_brain;
use synapse::service::{SearchMode, SearchRequest};

pub async fn search(config: &SynapseConfig, email: &str, query: &str, limit: Option<usize>) -> Result<()> {
    let conn = super::open(config)?;
    let user_id = super::profile_id(&conn, email)?;
    drop(conn);

    let brain = build_brain(config.clone())?;
    let response = brain
        .search(
            &user_id,
            SearchRequest {
                q: query.to_string(),
                threshold: None,
                limit,
            },
        )
        .await?;

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    if response.mode == SearchMode::Keyword {
        println!("(AI unavailable; showing keyword matches)");
    }
    println!("Found {} result(s)\n", response.results.len());

    for (i, m) in response.results.iter().enumerate() {
        println!("  {}. {} [{}] (score: {:.3})", i + 1, m.title, m.id, m.similarity);
        if !m.tags.is_empty() {
            println!("     tags: {}", m.tags.join(", "));
        }
        println!("     {}", m.summary.as_deref().unwrap_or(&m.preview));
        println!();
    }
    Ok(())
}
