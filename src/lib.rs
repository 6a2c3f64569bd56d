//! # Docs Agent
//!
//! A local documentation assistant. It keeps versioned documentation
//! snippets ("elements") for the languages, libraries and tools a project
//! uses, stores them in a local vector collection, and answers questions
//! through a locally hosted Ollama model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────────┐
//! │   CLI    │──▶│ add / update │──▶│ Element::save()  │
//! │ (docs)   │   └──────────────┘   └───┬──────────┬───┘
//! └────┬─────┘                          ▼          ▼
//!      │                        ┌──────────┐ ┌──────────────┐
//!      │                        │ manifest │ │ vector store │
//!      ▼                        │  (TOML)  │ │   (SQLite)   │
//! ┌──────────┐                  └──────────┘ └──────────────┘
//! │  Ollama  │
//! └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docs init                          # create .docs/ in the current directory
//! docs add serde ./notes/serde.md    # the version doubles as URL or path
//! docs update --force                # re-acquire every element
//! docs config CHAT_MODEL mistral     # persist a setting locally
//! docs ask --stream "How do I derive Deserialize?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Layered configuration with provenance |
//! | [`element`] | Element type and persistence |
//! | [`manifest`] | `.docs/elements.toml` read/merge/write |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`embedding`] | Embedder trait and vector helpers |
//! | [`acquire`] | Fetch documentation text from a URL or file |
//! | [`add`] | `docs add` |
//! | [`update`] | Staleness checks and `docs update` |
//! | [`setup`] | `docs init` |
//! | [`agent`] | Ollama client, conversations, `ask` and `chat` |
//! | [`filesize`] | Human-readable byte counts |
//! | [`logging`] | tracing subscriber setup |
//! | [`models`] | Record types shared by the stores |

pub mod acquire;
pub mod add;
pub mod agent;
pub mod config;
pub mod element;
pub mod embedding;
pub mod filesize;
pub mod logging;
pub mod manifest;
pub mod models;
pub mod setup;
pub mod store;
pub mod update;
