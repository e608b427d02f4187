//! RustWeaver - Typed Workflow Graph Builder
//!
//! Declare bioinformatics pipelines as typed graphs of inputs, tool steps,
//! nested sub-workflows and outputs, then translate them to the Common
//! Workflow Language for execution elsewhere.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`types`]: Data types carried between ports, with their subtype rules
//! - [`catalog`]: Tool definitions and the built-in GATK4 catalog
//! - [`workflow`]: Graph construction, port resolution and YAML manifests
//! - [`translation`]: CWL documents and their persistence
//! - [`error`]: The error type shared by every module
//!
//! # Example
//!
//! ```rust,no_run
//! use rustweaver::catalog::ToolCatalog;
//! use rustweaver::types::DataType;
//! use rustweaver::workflow::{Input, Output, WorkflowDraft};
//! use rustweaver::{persist, translate, TranslationFormat, TranslationOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ToolCatalog::builtin();
//!     let mut w = WorkflowDraft::new("recalibrate");
//!
//!     let bam = w.add_input(Input::new("bam", DataType::IndexedBam))?;
//!     let reference = w.add_input(Input::new("reference", DataType::FastaWithDict))?;
//!     let recal = w.add_step("baseRecal", catalog.get("Gatk4BaseRecalibrator")?)?;
//!     let table = w.add_output(Output::new("recal_table"))?;
//!
//!     w.add_edge(&bam, recal.port("input"))?;
//!     w.add_edge(&reference, &recal)?;
//!     w.add_edge(&recal, &table)?;
//!
//!     let compiled = w.compile()?;
//!     let options = TranslationOptions::default();
//!     let translation = translate(&compiled, TranslationFormat::Cwl, &options)?;
//!     persist(&translation, "cwl/")?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod translation;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use catalog::{ToolCatalog, ToolDefinition};
pub use error::{GraphError, Result};
pub use translation::{persist, translate, Translation, TranslationFormat, TranslationOptions};
pub use types::DataType;
pub use workflow::{load_manifest, CompiledWorkflow, WorkflowDraft};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "RustWeaver";
