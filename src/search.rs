//! The `ask search` command: query the index directly and print ranked
//! hits. Useful for checking what the chatbot would retrieve.

use anyhow::Result;

use crate::config::Config;
use crate::index::{SearchIndex, SqliteIndex};

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let k = limit.unwrap_or(config.retrieval.top_k);
    let index = SqliteIndex::open(config).await?;
    let hits = index.similarity_query(query, k).await?;

    if hits.is_empty() {
        println!("No results.");
        index.close().await;
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let title = hit.title.as_deref().unwrap_or("(untitled)");
        println!("{}. [{:.3}] {} / {}", i + 1, hit.score, hit.source, title);
        println!("    \"{}\"", excerpt(&hit.text, 240));
        println!();
    }

    index.close().await;
    Ok(())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(excerpt("hello world", 240), "hello world");
    }

    #[test]
    fn newlines_are_flattened() {
        assert_eq!(excerpt("a\nb\n\nc", 240), "a b c");
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let text = "word ".repeat(100);
        let out = excerpt(&text, 20);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= 23);
    }
}
