//! Workflow Manifests
//!
//! Loads workflow declarations from YAML. Every declaration goes through
//! the same [`WorkflowDraft`] calls a Rust caller would make, so a manifest
//! fails with exactly the errors the builder raises.
//!
//! # Example YAML Format
//!
//! ```yaml
//! catalog: extra_tools.yaml      # optional, extends the built-in catalog
//! main: dedup                    # optional, defaults to the last workflow
//! workflows:
//!   - name: dedup
//!     inputs:
//!       - id: bam
//!         type: Bam
//!     steps:
//!       - id: markDuplicates
//!         tool: Gatk4MarkDuplicates
//!     edges:
//!       - [bam, markDuplicates.input]
//!     defaults:
//!       - port: markDuplicates.createIndex
//!         value: true
//!     outputs:
//!       - id: markDup_metrics
//!         source: markDuplicates.metrics
//! ```
//!
//! Endpoints are written `node` or `node.port`. A step uses either a
//! catalog `tool` or a `workflow` declared earlier in the same manifest.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use super::builder::{CompiledWorkflow, WorkflowDraft};
use super::node::{Input, Output, StepTool};
use super::resolver::EndpointSpec;
use crate::catalog::ToolCatalog;
use crate::error::{GraphError, Result};
use crate::types::DataType;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct InputDecl {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub accumulate: bool,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct OutputDecl {
    pub id: String,
    #[serde(default, rename = "type")]
    pub data_type: Option<DataType>,
    /// Shorthand for an edge from this endpoint to the output
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct StepDecl {
    pub id: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DefaultDecl {
    pub port: String,
    pub value: Value,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDecl {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputDecl>,
    #[serde(default)]
    pub steps: Vec<StepDecl>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
    #[serde(default)]
    pub defaults: Vec<DefaultDecl>,
    #[serde(default)]
    pub outputs: Vec<OutputDecl>,
}

/// Top-level manifest document.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub main: Option<String>,
    pub workflows: Vec<WorkflowDecl>,
}

/// Every workflow of a manifest, compiled in declaration order.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    workflows: Vec<Arc<CompiledWorkflow>>,
    main: String,
}

impl LoadedManifest {
    /// The workflow named by `main`, or the last one declared.
    pub fn main(&self) -> Result<Arc<CompiledWorkflow>> {
        self.workflow(&self.main)
    }

    pub fn workflow(&self, name: &str) -> Result<Arc<CompiledWorkflow>> {
        self.workflows
            .iter()
            .find(|w| w.name() == name)
            .cloned()
            .ok_or_else(|| GraphError::Manifest(format!("Manifest has no workflow '{}'", name)))
    }

    pub fn workflows(&self) -> &[Arc<CompiledWorkflow>] {
        &self.workflows
    }
}

/// Loads and compiles every workflow of a manifest file.
///
/// A relative `catalog` path is resolved against the manifest's directory.
///
/// # Example
///
/// ```rust,no_run
/// use rustweaver::workflow::load_manifest;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manifest = load_manifest("somatic.yaml")?;
///     println!("Main workflow: {}", manifest.main()?.name());
///     Ok(())
/// }
/// ```
pub fn load_manifest(path: impl AsRef<Path>) -> Result<LoadedManifest> {
    let path = path.as_ref();
    info!("Loading manifest from: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|e| {
        GraphError::Manifest(format!(
            "Failed to read manifest '{}': {}. Check that the file exists and is readable.",
            path.display(),
            e
        ))
    })?;
    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    let manifest = parse_manifest(&yaml_content)?;

    let mut catalog = ToolCatalog::builtin();
    if let Some(catalog_path) = &manifest.catalog {
        let catalog_path = match path.parent() {
            Some(dir) if catalog_path.is_relative() => dir.join(catalog_path),
            _ => catalog_path.clone(),
        };
        catalog.extend(ToolCatalog::load(catalog_path)?)?;
    }

    build_manifest(&manifest, &catalog)
}

/// Parses manifest YAML without building anything.
pub fn parse_manifest(yaml: &str) -> Result<Manifest> {
    serde_yaml::from_str(yaml).map_err(|e| {
        GraphError::Manifest(format!(
            "Failed to parse manifest YAML: {}. Check the file format.",
            e
        ))
    })
}

/// Builds and compiles every workflow of a parsed manifest.
pub fn build_manifest(manifest: &Manifest, catalog: &ToolCatalog) -> Result<LoadedManifest> {
    let mut compiled: HashMap<String, Arc<CompiledWorkflow>> = HashMap::new();
    let mut workflows = Vec::with_capacity(manifest.workflows.len());

    for decl in &manifest.workflows {
        if compiled.contains_key(&decl.name) {
            return Err(GraphError::Manifest(format!(
                "Workflow '{}' is declared twice",
                decl.name
            )));
        }

        let workflow = Arc::new(build_workflow(decl, catalog, &compiled)?);
        compiled.insert(decl.name.clone(), Arc::clone(&workflow));
        workflows.push(workflow);
    }

    let main = match &manifest.main {
        Some(name) => name.clone(),
        None => workflows
            .last()
            .map(|w| w.name().to_string())
            .ok_or_else(|| GraphError::Manifest("Manifest declares no workflows".to_string()))?,
    };

    let loaded = LoadedManifest { workflows, main };
    loaded.main()?;

    info!("Loaded {} workflows, main: '{}'", loaded.workflows.len(), loaded.main);
    Ok(loaded)
}

fn parse_endpoint(draft: &WorkflowDraft, text: &str) -> Result<EndpointSpec> {
    let (node, port) = match text.trim().split_once('.') {
        Some((node, port)) => (node, Some(port)),
        None => (text.trim(), None),
    };

    let handle = draft.handle(node).ok_or_else(|| GraphError::UnknownNode {
        workflow: draft.name().to_string(),
        node: node.to_string(),
    })?;

    Ok(match port {
        Some(port) => handle.port(port),
        None => handle.endpoint(),
    })
}

fn build_workflow(
    decl: &WorkflowDecl,
    catalog: &ToolCatalog,
    compiled: &HashMap<String, Arc<CompiledWorkflow>>,
) -> Result<CompiledWorkflow> {
    let mut draft = WorkflowDraft::new(&decl.name);
    if let Some(doc) = &decl.doc {
        draft = draft.with_doc(doc);
    }

    for input in &decl.inputs {
        let mut node = Input::new(&input.id, input.data_type.clone());
        if let Some(value) = &input.default {
            node = node.with_default(value.clone());
        }
        if input.accumulate {
            node = node.accumulating();
        }
        if let Some(doc) = &input.doc {
            node = node.with_doc(doc);
        }
        draft.add_input(node)?;
    }

    for step in &decl.steps {
        let tool: StepTool = match (&step.tool, &step.workflow) {
            (Some(tool), None) => catalog.get(tool)?.into(),
            (None, Some(workflow)) => compiled
                .get(workflow)
                .cloned()
                .ok_or_else(|| {
                    GraphError::Manifest(format!(
                        "Step '{}' uses workflow '{}', which is not declared before '{}'",
                        step.id, workflow, decl.name
                    ))
                })?
                .into(),
            _ => {
                return Err(GraphError::Manifest(format!(
                    "Step '{}' must name exactly one of 'tool' or 'workflow'",
                    step.id
                )))
            }
        };
        draft.add_step(&step.id, tool)?;
    }

    for output in &decl.outputs {
        let mut node = match &output.data_type {
            Some(ty) => Output::typed(&output.id, ty.clone()),
            None => Output::new(&output.id),
        };
        if let Some(doc) = &output.doc {
            node = node.with_doc(doc);
        }
        draft.add_output(node)?;
    }

    for (source, destination) in &decl.edges {
        let source = parse_endpoint(&draft, source)?;
        let destination = parse_endpoint(&draft, destination)?;
        draft.add_edge(source, destination)?;
    }

    for default in &decl.defaults {
        let port = parse_endpoint(&draft, &default.port)?;
        draft.add_default_value(port, default.value.clone())?;
    }

    for output in &decl.outputs {
        if let Some(source) = &output.source {
            let source = parse_endpoint(&draft, source)?;
            let destination = parse_endpoint(&draft, &output.id)?;
            draft.add_edge(source, destination)?;
        }
    }

    draft.compile()
}
