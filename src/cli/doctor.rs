//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use synapse::config::SynapseConfig;
use synapse::db;

pub fn doctor(config: &SynapseConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `synapse profile create` or `synapse serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Synapse Health Report");
    println!("=====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("AI provider:       {}", config.ai.provider);
    println!(
        "API key:           {}",
        if config.ai.api_key.is_empty() { "(not set)" } else { "set" }
    );
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.ai.embedding_model);
    match &report.embedding_model {
        Some(stored) if stored != &config.ai.embedding_model => {
            println!("  WARNING: model mismatch! Run `synapse reembed --all` to refresh vectors.");
        }
        Some(_) => println!("  Status:          OK (match)"),
        None => {}
    }
    println!();
    println!("Row counts:");
    println!("  Profiles:        {}", report.profile_count);
    println!("  Notes:           {}", report.note_count);
    println!("  Embedded notes:  {}", report.embedded_note_count);
    if report.embedded_note_count < report.note_count {
        println!(
            "  {} note(s) have no vector; run `synapse reembed`.",
            report.note_count - report.embedded_note_count
        );
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore a backup, or `synapse export --email <you> > backup.json` from a good copy.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
