//! Document retrieval by id for `docsearch get`.

use anyhow::{bail, Result};

use crate::search::SearchEngine;

pub async fn run_get(engine: &SearchEngine, id: &str, json: bool) -> Result<()> {
    let Some(doc) = engine.get_document_by_id(id).await? else {
        bail!("document not found: {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("--- Document ---");
    println!("id:            {}", doc.id);
    println!("title:         {}", doc.title);
    println!("source:        {}", doc.source);
    println!("path:          {}", doc.path);
    println!("relative_path: {}", doc.relative_path);
    for (key, value) in &doc.metadata {
        println!("meta.{:<9} {}", format!("{}:", key), value);
    }
    println!();

    if !doc.headings.is_empty() {
        println!("--- Headings ({}) ---", doc.headings.len());
        for heading in &doc.headings {
            println!("{}", heading);
        }
        println!();
    }

    println!("--- Content ---");
    println!("{}", doc.content);

    Ok(())
}
