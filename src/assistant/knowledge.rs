//! Keyword retrieval over a JSON knowledge base
//!
//! The knowledge base is a JSON array of objects carrying a `content`
//! string. Queries are split into keywords (Unicode words, with runs of CJK
//! ideographs turned into overlapping bigrams) and chunks are ranked by the
//! total number of keyword occurrences.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

/// Words that carry no retrieval signal
const STOPWORDS: [&str; 9] = [
    "什么", "是", "的", "如何", "怎么", "请问", "有哪些", "介绍", "一下",
];

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnowledgeChunk {
    pub content: String,
}

/// A retrieved chunk with its match score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a KnowledgeChunk,
    pub score: usize,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    chunks: Vec<KnowledgeChunk>,
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

fn flush_run(run: &mut Vec<char>, out: &mut Vec<String>) {
    if run.len() >= 2 {
        out.extend(run.windows(2).map(|pair| pair.iter().collect::<String>()));
    }
    run.clear();
}

/// Split a query into retrieval keywords
///
/// Falls back to the whole trimmed query when no usable keyword remains.
#[must_use]
pub fn keywords(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run: Vec<char> = Vec::new();

    for segment in query.split_word_bounds() {
        let mut chars = segment.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if is_cjk(c) => run.push(c),
            _ => {
                flush_run(&mut run, &mut tokens);
                if segment.chars().any(char::is_alphanumeric) {
                    tokens.push(segment.to_string());
                }
            }
        }
    }
    flush_run(&mut run, &mut tokens);

    let mut seen = HashSet::new();
    let keywords: Vec<String> = tokens
        .into_iter()
        .filter(|t| t.chars().count() > 1 && !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if keywords.is_empty() {
        vec![query.trim().to_string()]
    } else {
        keywords
    }
}

impl KnowledgeBase {
    #[must_use]
    pub fn new(chunks: Vec<KnowledgeChunk>) -> Self {
        Self { chunks }
    }

    /// Load a knowledge base file, dropping the first `skip` entries
    ///
    /// Entries without a string `content` field are ignored.
    pub fn load(path: impl AsRef<Path>, skip: usize) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge base {}", path.display()))?;
        let entries: Vec<Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse knowledge base {}", path.display()))?;
        let total = entries.len();

        let chunks: Vec<KnowledgeChunk> = entries
            .into_iter()
            .skip(skip)
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if chunks.len() + skip.min(total) < total {
            warn!(
                "Ignored {} knowledge base entries without text content",
                total - skip.min(total) - chunks.len()
            );
        }
        info!(
            "Loaded knowledge base from {} with {} entries ({} skipped)",
            path.display(),
            chunks.len(),
            skip.min(total)
        );
        Ok(Self { chunks })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank chunks by keyword occurrences and return the best `top_k`
    ///
    /// Only positive scores are kept; ties keep knowledge base order and
    /// chunks with identical content are returned once.
    #[must_use]
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<ScoredChunk<'_>> {
        let keywords = keywords(query);
        debug!(?keywords, "Extracted query keywords");

        let mut scored: Vec<ScoredChunk<'_>> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let score = keywords
                    .iter()
                    .map(|k| chunk.content.matches(k.as_str()).count())
                    .sum();
                (score > 0).then_some(ScoredChunk { chunk, score })
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));

        let mut seen = HashSet::new();
        scored.retain(|s| seen.insert(s.chunk.content.as_str()));
        debug!("Retrieved {} relevant chunks", scored.len());

        scored.truncate(top_k);
        scored
    }
}

/// Build the model prompt; with no context the question is sent as is
#[must_use]
pub fn build_prompt(query: &str, chunks: &[ScoredChunk<'_>]) -> String {
    if chunks.is_empty() {
        debug!("No relevant context found, sending the bare question");
        return query.to_string();
    }

    let context = chunks
        .iter()
        .map(|s| s.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "请仅根据以下提供的上下文来回答问题。如果上下文中没有足够的信息，请回答“根据提供的资料，我无法回答该问题”。\n\n上下文:\n{context}\n\n问题: {query}\n"
    )
}
