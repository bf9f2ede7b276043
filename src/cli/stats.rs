//! CLI `stats` command.

use anyhow::Result;

use synapse::brain::stats;
use synapse::config::SynapseConfig;

pub fn stats(config: &SynapseConfig, email: &str, json: bool) -> Result<()> {
    let conn = super::open(config)?;
    let user_id = super::profile_id(&conn, email)?;
    let s = stats::brain_stats(&conn, &user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&s)?);
        return Ok(());
    }

    println!("Synapse Statistics for {email}");
    println!("==============================");
    println!();
    println!("Folders:           {} ({} projects)", s.folders, s.projects);
    println!("Notes:             {}", s.notes);
    println!("  Archived:        {}", s.archived_notes);
    println!("  Pinned:          {}", s.pinned_notes);
    println!("  Embedded:        {}", s.embedded_notes);
    println!("  Analyzed:        {}", s.analyzed_notes);
    println!("Tasks:");
    println!("  To do:           {}", s.tasks.todo);
    println!("  In progress:     {}", s.tasks.in_progress);
    println!("  Done:            {}", s.tasks.done);
    println!("Templates:         {}", s.templates);
    println!("Events:            {}", s.events);
    println!("Connections:       {}", s.connections);
    Ok(())
}
