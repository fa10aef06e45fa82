//! # Sahayak
//!
//! A local-first retrieval-augmented teaching assistant. Course material
//! (PDF, Word, PowerPoint, plain text, web pages) is extracted into a JSON
//! knowledge store; questions are answered extractively from the nearest
//! chunks, and worksheets or assessments are generated from a grounding
//! excerpt by a pluggable language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Extract    │──▶│  Knowledge   │──▶│    Chunk     │
//! │ file / URL  │   │  store (JSON)│   │  (sentences) │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                        ┌────────────────────┤
//!                        ▼                    ▼
//!                 ┌──────────────┐     ┌──────────────┐
//!                 │ Embed + L2   │     │ Prompt +     │
//!                 │ index: /ask  │     │ generate     │
//!                 └──────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sahayak ingest ./course-notes        # extract a directory of files
//! sahayak scrape https://example.org/photosynthesis
//! sahayak ask "What is photosynthesis?"
//! sahayak generate --difficulty Easy --mode worksheet
//! sahayak serve                        # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Multi-format text extraction |
//! | [`scrape`] | Web page ingestion |
//! | [`scan`] | Directory walking for bulk ingestion |
//! | [`store`] | Durable JSON knowledge store |
//! | [`chunk`] | Sentence-boundary chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Exact L2 nearest-neighbour index |
//! | [`retrieve`] | Extractive question answering |
//! | [`prompt`] | Worksheet and assessment prompts |
//! | [`generate`] | Text-generation backends |
//! | [`pipeline`] | The pipeline tying the above together |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;
pub mod scan;
pub mod scrape;
pub mod server;
pub mod store;
