//! Translation
//!
//! Turns a [`CompiledWorkflow`] into pipeline-description documents.
//! Translating is a pure read of the workflow: writing the documents is a
//! separate [`persist`] step.
//!
//! # Example
//!
//! ```rust,no_run
//! use rustweaver::translation::{persist, translate, TranslationFormat, TranslationOptions};
//! # fn demo(workflow: &rustweaver::workflow::CompiledWorkflow) -> rustweaver::Result<()> {
//! let translation = translate(workflow, TranslationFormat::Cwl, &TranslationOptions::default())?;
//! println!("{}", translation.main.content);
//! persist(&translation, "out/")?;
//! # Ok(())
//! # }
//! ```

pub mod cwl;
mod persist;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};

use crate::error::{GraphError, Result};
use crate::workflow::CompiledWorkflow;

pub use persist::persist;

/// Root of the default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_ROOT: &str = ".rustweaver/translations";

/// Supported target grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationFormat {
    /// Common Workflow Language v1.0, YAML encoding
    #[default]
    Cwl,
}

impl FromStr for TranslationFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cwl" => Ok(TranslationFormat::Cwl),
            _ => Err(GraphError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for TranslationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationFormat::Cwl => f.write_str("cwl"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Emit container requirements for tools that declare an image
    pub with_docker: bool,
    /// Write the documents when going through [`translate_to_disk`]
    pub to_disk: bool,
    /// Overrides the default output directory
    pub output_dir: Option<PathBuf>,
}

/// One rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    /// Location relative to the translation's root directory
    pub path: PathBuf,
    pub content: String,
}

/// All documents produced for one workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub format: TranslationFormat,
    pub main: Document,
    pub subworkflows: Vec<Document>,
    pub tools: Vec<Document>,
}

impl Translation {
    /// The main document first, then sub-workflows, then tools.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        std::iter::once(&self.main)
            .chain(self.subworkflows.iter())
            .chain(self.tools.iter())
    }

    pub fn document_count(&self) -> usize {
        1 + self.subworkflows.len() + self.tools.len()
    }
}

/// Collects documents by name, keeping the first of identical duplicates.
#[derive(Debug, Default)]
pub struct DocumentSet {
    subworkflows: Vec<Document>,
    tools: Vec<Document>,
    seen: HashMap<PathBuf, usize>,
}

impl DocumentSet {
    fn add(
        documents: &mut Vec<Document>,
        seen: &mut HashMap<PathBuf, usize>,
        document: Document,
    ) -> Result<()> {
        match seen.get(&document.path) {
            Some(&position) if documents[position].content == document.content => {
                debug!("Document '{}' already translated", document.path.display());
                Ok(())
            }
            Some(_) => Err(GraphError::ConflictingDocument(
                document.path.display().to_string(),
            )),
            None => {
                seen.insert(document.path.clone(), documents.len());
                documents.push(document);
                Ok(())
            }
        }
    }

    pub fn add_tool(&mut self, document: Document) -> Result<()> {
        Self::add(&mut self.tools, &mut self.seen, document)
    }

    pub fn add_subworkflow(&mut self, document: Document) -> Result<()> {
        Self::add(&mut self.subworkflows, &mut self.seen, document)
    }
}

/// Translates a compiled workflow. Never touches the filesystem.
pub fn translate(
    workflow: &CompiledWorkflow,
    format: TranslationFormat,
    options: &TranslationOptions,
) -> Result<Translation> {
    info!("Translating workflow '{}' to {}", workflow.name(), format);

    let mut documents = DocumentSet::default();
    let main = match format {
        TranslationFormat::Cwl => cwl::workflow_document(workflow, false, options, &mut documents)?,
    };

    let translation = Translation {
        format,
        main,
        subworkflows: documents.subworkflows,
        tools: documents.tools,
    };

    info!(
        "Translated '{}': {} sub-workflows, {} tools",
        workflow.name(),
        translation.subworkflows.len(),
        translation.tools.len()
    );
    Ok(translation)
}

/// `.rustweaver/translations/<workflow>` under the working directory.
pub fn default_output_dir(workflow: &str) -> PathBuf {
    Path::new(DEFAULT_OUTPUT_ROOT).join(workflow)
}

/// Translates and, when `options.to_disk` is set, persists under
/// `options.output_dir` or the default directory.
///
/// Returns the written paths, empty when nothing was written.
pub fn translate_to_disk(
    workflow: &CompiledWorkflow,
    format: TranslationFormat,
    options: &TranslationOptions,
) -> Result<(Translation, Vec<PathBuf>)> {
    let translation = translate(workflow, format, options)?;
    if !options.to_disk {
        return Ok((translation, Vec::new()));
    }

    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(workflow.name()));
    let written = persist(&translation, &dir)?;
    Ok((translation, written))
}
