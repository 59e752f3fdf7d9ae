//! # askdocs
//!
//! A retrieval-augmented documentation chatbot for the terminal.
//!
//! askdocs ingests documents from local folders and optional
//! Confluence / Mantis APIs, chunks and indexes them in SQLite
//! (FTS5 + embedding vectors), and drives a conversational loop that
//! decides per turn whether to search the index before answering.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Connectors       │──▶│   Ingest     │──▶│  SQLite   │
//! │ FS/Confluence/   │   │ Chunk+Embed  │   │ FTS5+Vec  │
//! │ Mantis           │   └──────────────┘   └────┬──────┘
//! └──────────────────┘                           │
//!                                     ┌──────────┴────────┐
//!                                     ▼                   ▼
//!                               ┌───────────┐      ┌────────────┐
//!                               │ ask search│      │  ask chat  │
//!                               └───────────┘      │ retrieval  │
//!                                                  │ loop + LLM │
//!                                                  └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ask init                     # create database
//! ask sync filesystem          # ingest local docs
//! ask search "deployment"      # inspect what retrieval would find
//! ask chat                     # start the chatbot
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`connector`] | Source connector trait and registry |
//! | [`connector_fs`] | Local documentation folder connector |
//! | [`connector_confluence`] | Confluence wiki connector |
//! | [`connector_mantis`] | Mantis issue tracker connector |
//! | [`chunk`] | Overlapping text chunking |
//! | [`extract`] | PDF / HTML text extraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Chunk similarity search |
//! | [`llm`] | Chat-completion providers |
//! | [`retrieve`] | Iterative retrieval loop |
//! | [`chat`] | Conversation driver |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod connector;
pub mod connector_confluence;
pub mod connector_fs;
pub mod connector_mantis;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod search;
pub mod sources;
