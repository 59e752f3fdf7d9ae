//! The iterative retrieval loop.
//!
//! Given a user question and optionally the context gathered for an
//! earlier question, [`retrieve`] runs up to `max_iterations` search
//! rounds against the index. Each round refines the search query through
//! the LLM, folds the returned chunk texts into a combined context
//! string, and asks the LLM whether another round is warranted.

use tracing::debug;

use crate::index::SearchIndex;
use crate::llm::{self, LlmError, LlmProvider, Message};

/// Retrieval failure, separated by boundary so callers can tell a model
/// problem from an index problem.
#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Index(#[from] anyhow::Error),
}

impl RetrieveError {
    /// Configuration errors cannot be retried; everything else is
    /// transient from the conversation loop's point of view.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RetrieveError::Llm(LlmError::NotConfigured(_)))
    }
}

/// Outcome of the query-refinement step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refinement {
    /// Run another search round with this query.
    Search(String),
    /// The model judged further searching pointless.
    Done,
}

/// Map a refinement reply onto a tagged outcome. The literal `DONE`
/// (any case, optionally quoted) requests early termination; anything
/// else is the next search query.
pub fn parse_refinement(response: &str) -> Refinement {
    let cleaned = response
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();

    if cleaned.trim_end_matches('.').eq_ignore_ascii_case("done") {
        Refinement::Done
    } else {
        Refinement::Search(cleaned.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub max_iterations: usize,
    pub top_k: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            top_k: 4,
        }
    }
}

const SEARCH_SYSTEM_PROMPT: &str =
    "You help decide how to search a documentation index to answer a user's question. \
     Follow the instruction you are given exactly.";

/// Run the retrieval loop and return the combined context string.
///
/// On round 0 with `prior_context` present, the raw question is used as
/// the query and refinement is skipped. The result may be empty when the
/// index returns nothing; that is not an error.
pub async fn retrieve(
    index: &dyn SearchIndex,
    llm: &dyn LlmProvider,
    question: &str,
    prior_context: Option<&str>,
    options: &RetrievalOptions,
) -> Result<String, RetrieveError> {
    let mut combined = String::new();

    for round in 0..options.max_iterations {
        let query = if round == 0 && prior_context.is_some() {
            question.to_string()
        } else {
            match next_query(llm, question, prior_context, &combined).await? {
                Refinement::Search(q) => q,
                Refinement::Done => break,
            }
        };

        debug!("retrieval round {}: querying for '{}'", round, query);

        let hits = index.similarity_query(&query, options.top_k).await?;
        for hit in &hits {
            if !combined.is_empty() {
                combined.push_str("\n\n");
            }
            combined.push_str(&hit.text);
        }

        if !should_continue(llm, question, &combined).await? {
            break;
        }
    }

    Ok(combined)
}

/// Ask the LLM what to search for next.
async fn next_query(
    llm: &dyn LlmProvider,
    question: &str,
    prior_context: Option<&str>,
    gathered: &str,
) -> Result<Refinement, RetrieveError> {
    let mut system = SEARCH_SYSTEM_PROMPT.to_string();
    if let Some(prior) = prior_context {
        system.push_str("\n\nHere is some earlier context that may help:\n");
        system.push_str(prior);
    }
    if !gathered.is_empty() {
        system.push_str("\n\nPassages found so far:\n");
        system.push_str(gathered);
    }

    let messages = [
        Message::system(system),
        Message::user(format!(
            "The user asked: {}\n\nWhat search query should we use next to find the information \
             the user needs? We can refine the query if needed. If no more searching seems \
             necessary, say 'DONE' to stop early. Reply with the query text only.",
            question
        )),
    ];

    let response = llm.complete(&messages).await?;
    Ok(parse_refinement(&response))
}

/// Ask the LLM whether another search round is warranted.
async fn should_continue(
    llm: &dyn LlmProvider,
    question: &str,
    gathered: &str,
) -> Result<bool, RetrieveError> {
    let prompt = format!(
        "We were originally trying to find out the following information: {}\n\n\
         Passages found so far:\n{}\n\n\
         Do we need to continue searching (maybe we have not found a complete answer yet)?",
        question, gathered
    );
    Ok(llm::yes_or_no(llm, SEARCH_SYSTEM_PROMPT, &prompt).await?)
}
