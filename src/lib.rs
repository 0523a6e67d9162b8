//! # Jira Gateway - MCP tool surface over a Jira server
//!
//! Exposes a fixed catalog of Jira operations as MCP tools:
//! - One-shot connection validation gating the whole catalog
//! - An HTTP adapter that classifies every failure into a closed taxonomy
//! - Kind-keyed remediation suggestions for every failure
//! - Concurrent, failure-isolating batch execution
//! - Static dispatch with argument validation and a uniform result envelope
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────┐
//!   MCP (stdio)   →   │            ToolRouter            │
//!                     │  ┌──────────┐  ┌──────────────┐  │
//!                     │  │   Gate   │  │ ToolCatalog  │  │
//!                     │  │ (probe)  │  │ (JiraTool)   │  │
//!                     │  └──────────┘  └──────────────┘  │
//!                     │  ┌──────────┐  ┌──────────────┐  │
//!                     │  │  Batch   │  │  Transition  │  │
//!                     │  │  Engine  │  │ lookup → act │  │
//!                     │  └──────────┘  └──────────────┘  │
//!                     └────────────────┬─────────────────┘
//!                                      │ RemoteCall
//!                                      ▼
//!                           JiraClient (reqwest) → Jira
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod batch;
pub mod gate;
pub mod mcp;
pub mod remote;
pub mod router;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
