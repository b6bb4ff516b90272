//! Plan change report module
//!
//! This module turns OpenTofu/Terraform plan JSON into a Markdown change
//! report for operators reviewing a pending change.
//!
//! # Pipeline
//!
//! - **Detection**: Decide between streaming and full-document input
//! - **Parsing**: Normalize either shape into a [`PlanDocument`]
//! - **Classification**: Assign every resource to one bucket
//! - **Tag aggregation**: Summarize tag-only updates across resources
//! - **Rendering**: Emit the Markdown report
//!
//! # Example
//!
//! ```ignore
//! use planmd::diff::{detect_format, DiffRenderer, MarkdownRenderer, PlanParser};
//!
//! let format = detect_format(&content);
//! let plan = PlanParser::new().parse(&content, format)?;
//! let markdown = MarkdownRenderer::new().render(&plan);
//! ```

mod classify;
mod detect;
mod format;
mod parser;
mod renderer;
mod tags;
mod types;

pub use detect::{PlanFormat, detect_format};
pub use parser::PlanParser;
pub use renderer::{DiffRenderer, MarkdownRenderer};
pub use types::PlanDocument;
