//! The conversation driver.
//!
//! [`ChatSession`] owns everything a conversation needs: the LLM
//! provider, the search index handle, the append-only message history,
//! and the context retrieved for the previous question. Each turn first
//! judges whether the stored context is still relevant and sufficient
//! for the new question; only when it is not does the session invoke the
//! retrieval loop again.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

use crate::config::{ChatConfig, Config};
use crate::index::{SearchIndex, SqliteIndex};
use crate::llm::{self, LlmProvider, Message};
use crate::retrieve::{retrieve, RetrievalOptions, RetrieveError};

pub struct ChatSession {
    llm: Box<dyn LlmProvider>,
    index: Box<dyn SearchIndex>,
    options: RetrievalOptions,
    system_prompt: String,
    greeting: String,
    history: Vec<Message>,
    context: Option<String>,
}

impl ChatSession {
    pub fn new(
        llm: Box<dyn LlmProvider>,
        index: Box<dyn SearchIndex>,
        options: RetrievalOptions,
        chat_config: &ChatConfig,
    ) -> Self {
        let system_prompt = format!(
            "Your role is to give replies in conversational contexts and to answer yes/no \
             questions. Be sure to follow the INSTRUCTION you are given for your reply. Your \
             main function is to look up and answer questions about {}.",
            chat_config.doc_description
        );
        let greeting = chat_config.greeting.clone().unwrap_or_else(|| {
            format!(
                "Hello! I can answer your questions about {}. What would you like to know?",
                chat_config.doc_description
            )
        });

        Self {
            llm,
            index,
            options,
            system_prompt,
            greeting,
            history: Vec::new(),
            context: None,
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Execute one conversation turn and return the assistant's reply.
    pub async fn respond(&mut self, user_input: &str) -> Result<String, RetrieveError> {
        let question = user_input.trim().to_string();
        self.history.push(Message::user(question.clone()));

        if let Some(ctx) = self.context.clone() {
            let relevant = llm::yes_or_no(
                self.llm.as_ref(),
                &self.system_prompt,
                &format!(
                    "Consider the following information:\n{}\n\nIs this information relevant \
                     to the following question: '{}'?",
                    ctx, question
                ),
            )
            .await?;

            if relevant {
                let sufficient = llm::yes_or_no(
                    self.llm.as_ref(),
                    &self.system_prompt,
                    &format!(
                        "Consider the following information:\n{}\n\nDoes this contain enough \
                         information to completely answer the question: '{}'?",
                        ctx, question
                    ),
                )
                .await?;

                if sufficient {
                    // Context still answers the question; skip retrieval.
                    return self.reply().await;
                }
                // Relevant but incomplete: keep it as the prior for a
                // fresh retrieval pass.
            } else {
                self.context = None;
            }
        }

        let fresh = retrieve(
            self.index.as_ref(),
            self.llm.as_ref(),
            &question,
            self.context.as_deref(),
            &self.options,
        )
        .await?;
        self.context = Some(fresh);

        self.reply().await
    }

    /// Generate the assistant reply from the history and stored context,
    /// and record it in the history.
    async fn reply(&mut self) -> Result<String, RetrieveError> {
        let mut system = self.system_prompt.clone();
        if let Some(ctx) = &self.context {
            if !ctx.is_empty() {
                system.push_str(
                    "\n\nUse the following retrieved documentation excerpts when answering:\n",
                );
                system.push_str(ctx);
            }
        }

        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(system));
        messages.extend(self.history.iter().cloned());

        let reply = self.llm.complete(&messages).await?;
        self.history.push(Message::assistant(reply.clone()));
        Ok(reply)
    }
}

/// Run the interactive chat loop on stdin/stdout.
pub async fn run_chat(config: &Config) -> Result<()> {
    let index = SqliteIndex::open(config).await?;

    let doc_count = index.document_count().await?;
    if doc_count == 0 {
        bail!("No documents indexed. Run `ask sync all` before starting a chat.");
    }

    let provider = llm::create_provider(&config.llm)?;
    let options = RetrievalOptions {
        max_iterations: config.retrieval.max_search_iterations,
        top_k: config.retrieval.top_k,
    };
    let mut session = ChatSession::new(provider, Box::new(index), options, &config.chat);

    println!("{}", session.greeting());
    println!("(Ctrl-D or /quit to leave)");
    println!();

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }

        match session.respond(input).await {
            Ok(reply) => {
                println!();
                println!("{}", reply);
                println!();
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::error!("conversation turn failed: {}", e);
                eprintln!("Sorry, that went wrong ({}). Ask again.", e);
            }
        }
    }

    Ok(())
}
