//! Tool Catalog
//!
//! Typed definitions of the command-line tools a step can wrap. The graph
//! engine only reads their port schemas; command prefixes, output globs
//! and container images are carried through to the translated documents.
//!
//! # Example YAML Format
//!
//! ```yaml
//! - id: SamtoolsIndex
//!   version: "1.9"
//!   base_command: [samtools, index]
//!   container: biocontainers/samtools:v1.9-4-deb_cv1
//!   inputs:
//!     - name: bam
//!       type: Bam
//!       position: 1
//!   outputs:
//!     - name: out
//!       type: IndexedBam
//!       glob: "*.bam"
//! ```

pub mod builtin;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::types::DataType;
use crate::workflow::node::validate_identifier;
use crate::workflow::port::{HasPortSchema, PortSpec};

/// An input parameter of a catalog tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolInput {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    #[serde(default)]
    pub optional: bool,

    /// Value the tool uses when the port is left unbound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Command-line flag preceding the value (e.g. "-I")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,

    /// Array port fed by one edge per element
    #[serde(default)]
    pub accumulate: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl ToolInput {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            optional: false,
            default: None,
            prefix: None,
            position: None,
            accumulate: false,
            doc: None,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn accumulating(mut self) -> Self {
        self.accumulate = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// An output of a catalog tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    /// File pattern collected after the tool finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl ToolOutput {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            glob: None,
            doc: None,
        }
    }

    pub fn glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }
}

/// A command-line tool as seen by the workflow builder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Catalog identifier, also used as the translated document name
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    pub base_command: Vec<String>,

    /// Container image, emitted only when translating with docker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    #[serde(default)]
    pub inputs: Vec<ToolInput>,

    #[serde(default)]
    pub outputs: Vec<ToolOutput>,
}

impl ToolDefinition {
    /// Creates a tool with no ports.
    ///
    /// # Example
    ///
    /// ```
    /// use rustweaver::catalog::{ToolDefinition, ToolInput, ToolOutput};
    /// use rustweaver::types::DataType;
    ///
    /// let tool = ToolDefinition::new("SamtoolsIndex", ["samtools", "index"])
    ///     .with_input(ToolInput::new("bam", DataType::Bam).position(1))
    ///     .with_output(ToolOutput::new("out", DataType::IndexedBam).glob("*.bam"));
    ///
    /// assert!(tool.validate().is_ok());
    /// ```
    pub fn new<I, S>(id: impl Into<String>, base_command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            version: None,
            doc: None,
            base_command: base_command.into_iter().map(Into::into).collect(),
            container: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_container(mut self, image: impl Into<String>) -> Self {
        self.container = Some(image.into());
        self
    }

    pub fn with_input(mut self, input: ToolInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: ToolOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn input(&self, name: &str) -> Option<&ToolInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Checks identifiers, port name uniqueness and accumulate flags.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.id)?;

        let mut seen = HashSet::new();
        for input in &self.inputs {
            validate_identifier(&input.name)?;
            if !seen.insert(input.name.as_str()) {
                return Err(GraphError::Manifest(format!(
                    "tool '{}' declares input '{}' twice",
                    self.id, input.name
                )));
            }
            if input.accumulate && input.data_type.item().is_none() {
                return Err(GraphError::Manifest(format!(
                    "tool '{}': accumulating input '{}' must be an array, not {}",
                    self.id, input.name, input.data_type
                )));
            }
            if let Some(default) = &input.default {
                if !input.data_type.accepts_value(default) {
                    return Err(GraphError::InvalidDefault {
                        port: format!("{}/{}", self.id, input.name),
                        expected: input.data_type.clone(),
                        value: default.clone(),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            validate_identifier(&output.name)?;
            if !seen.insert(output.name.as_str()) {
                return Err(GraphError::Manifest(format!(
                    "tool '{}' declares output '{}' twice",
                    self.id, output.name
                )));
            }
        }

        Ok(())
    }
}

impl HasPortSchema for ToolDefinition {
    fn schema_id(&self) -> &str {
        &self.id
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        self.inputs
            .iter()
            .map(|input| PortSpec {
                name: input.name.clone(),
                data_type: input.data_type.clone(),
                optional: input.optional,
                accumulate: input.accumulate,
                default: input.default.clone(),
            })
            .collect()
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        self.outputs
            .iter()
            .map(|output| PortSpec::new(output.name.clone(), output.data_type.clone()))
            .collect()
    }
}

/// A named collection of tool definitions, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<Arc<ToolDefinition>>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of GATK4 and alignment tools shipped with the crate.
    pub fn builtin() -> Self {
        builtin::BUILTIN_CATALOG.clone()
    }

    /// Parses a YAML list of tool definitions.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let tools: Vec<ToolDefinition> = serde_yaml::from_str(yaml)
            .map_err(|e| GraphError::Manifest(format!("Failed to parse tool catalog: {}", e)))?;

        let mut catalog = Self::new();
        for tool in tools {
            catalog.register(tool)?;
        }
        Ok(catalog)
    }

    /// Loads a YAML catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading tool catalog from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            GraphError::Manifest(format!(
                "Failed to read tool catalog '{}': {}",
                path.display(),
                e
            ))
        })?;

        let catalog = Self::from_yaml(&content)?;
        info!("Loaded {} tools", catalog.len());
        Ok(catalog)
    }

    /// Adds a tool, replacing any previous tool with the same id.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<Arc<ToolDefinition>> {
        tool.validate()?;

        let tool = Arc::new(tool);
        match self.index.get(&tool.id) {
            Some(&position) => {
                debug!("Replacing catalog tool '{}'", tool.id);
                self.tools[position] = Arc::clone(&tool);
            }
            None => {
                self.index.insert(tool.id.clone(), self.tools.len());
                self.tools.push(Arc::clone(&tool));
            }
        }
        Ok(tool)
    }

    /// Adds every tool of `other`, later definitions winning.
    pub fn extend(&mut self, other: ToolCatalog) -> Result<()> {
        for tool in other.tools {
            self.register(Arc::unwrap_or_clone(tool))?;
        }
        Ok(())
    }

    /// Looks up a tool by id.
    pub fn get(&self, id: &str) -> Result<Arc<ToolDefinition>> {
        self.index
            .get(id)
            .map(|&position| Arc::clone(&self.tools[position]))
            .ok_or_else(|| GraphError::UnknownTool(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
