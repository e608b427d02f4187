//! Workflow Nodes
//!
//! The three node kinds a workflow graph is built from. Inputs and Outputs
//! carry a single implicit port named after themselves; Steps expose the
//! ports of the tool or compiled sub-workflow they wrap.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::builder::CompiledWorkflow;
use super::port::{Direction, HasPortSchema, Port, PortSpec};
use super::resolver::EndpointSpec;
use crate::catalog::ToolDefinition;
use crate::error::{GraphError, Result};
use crate::types::DataType;

/// Checks that an identifier is usable as a node, port or document name.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(GraphError::InvalidIdentifier(identifier.to_string()))
    }
}

/// A workflow input declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub id: String,
    pub data_type: DataType,
    pub default: Option<Value>,
    /// Exposed as an accumulating port when the workflow is used as a step
    pub accumulate: bool,
    pub doc: Option<String>,
}

impl Input {
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into().trim().to_string(),
            data_type,
            default: None,
            accumulate: false,
            doc: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks an array input as taking one element per incoming edge.
    pub fn accumulating(mut self) -> Self {
        self.accumulate = true;
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_identifier(&self.id)?;

        if self.accumulate && self.data_type.item().is_none() {
            return Err(GraphError::InvalidType(format!(
                "accumulating input '{}' must be an array, not {}",
                self.id, self.data_type
            )));
        }

        if let Some(value) = &self.default {
            if !self.data_type.accepts_value(value) {
                return Err(GraphError::InvalidDefault {
                    port: self.id.clone(),
                    expected: self.data_type.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A workflow output declaration.
///
/// Without a declared type the output takes the type of the port wired
/// into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub id: String,
    pub data_type: Option<DataType>,
    pub doc: Option<String>,
}

impl Output {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            data_type: None,
            doc: None,
        }
    }

    pub fn typed(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            ..Self::new(id)
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// What a step runs: a catalog tool or a compiled sub-workflow.
#[derive(Debug, Clone)]
pub enum StepTool {
    Tool(Arc<ToolDefinition>),
    Workflow(Arc<CompiledWorkflow>),
}

impl StepTool {
    pub fn is_workflow(&self) -> bool {
        matches!(self, StepTool::Workflow(_))
    }

    fn schema(&self) -> &dyn HasPortSchema {
        match self {
            StepTool::Tool(tool) => tool.as_ref(),
            StepTool::Workflow(workflow) => workflow.as_ref(),
        }
    }
}

impl HasPortSchema for StepTool {
    fn schema_id(&self) -> &str {
        self.schema().schema_id()
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        self.schema().input_ports()
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        self.schema().output_ports()
    }
}

impl From<Arc<ToolDefinition>> for StepTool {
    fn from(tool: Arc<ToolDefinition>) -> Self {
        StepTool::Tool(tool)
    }
}

impl From<ToolDefinition> for StepTool {
    fn from(tool: ToolDefinition) -> Self {
        StepTool::Tool(Arc::new(tool))
    }
}

impl From<Arc<CompiledWorkflow>> for StepTool {
    fn from(workflow: Arc<CompiledWorkflow>) -> Self {
        StepTool::Workflow(workflow)
    }
}

impl From<CompiledWorkflow> for StepTool {
    fn from(workflow: CompiledWorkflow) -> Self {
        StepTool::Workflow(Arc::new(workflow))
    }
}

/// A step declaration.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    pub tool: StepTool,
}

/// Kind of a registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Input,
    Output,
    Step,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Input => f.write_str("input"),
            NodeKind::Output => f.write_str("output"),
            NodeKind::Step => f.write_str("step"),
        }
    }
}

/// A node owned by a workflow.
#[derive(Debug, Clone)]
pub enum Node {
    Input(Input),
    Output(Output),
    Step(Step),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Input(input) => &input.id,
            Node::Output(output) => &output.id,
            Node::Step(step) => &step.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Input(_) => NodeKind::Input,
            Node::Output(_) => NodeKind::Output,
            Node::Step(_) => NodeKind::Step,
        }
    }

    /// All ports of this node, inputs before outputs, in schema order.
    pub fn ports(&self) -> Vec<Port> {
        match self {
            Node::Input(input) => vec![Port {
                node: input.id.clone(),
                name: input.id.clone(),
                direction: Direction::Out,
                data_type: Some(input.data_type.clone()),
                optional: input.default.is_some(),
                accumulate: false,
                implicit: true,
            }],
            Node::Output(output) => vec![Port {
                node: output.id.clone(),
                name: output.id.clone(),
                direction: Direction::In,
                data_type: output.data_type.clone(),
                optional: false,
                accumulate: false,
                implicit: true,
            }],
            Node::Step(step) => {
                let inputs = step.tool.input_ports();
                let outputs = step.tool.output_ports();

                inputs
                    .iter()
                    .map(|spec| Port::from_spec(&step.id, spec, Direction::In))
                    .chain(
                        outputs
                            .iter()
                            .map(|spec| Port::from_spec(&step.id, spec, Direction::Out)),
                    )
                    .collect()
            }
        }
    }

    /// Ports of one direction.
    pub fn ports_towards(&self, direction: Direction) -> Vec<Port> {
        self.ports()
            .into_iter()
            .filter(|p| p.direction == direction)
            .collect()
    }

    /// Looks up a named port of the given direction.
    ///
    /// Input and Output nodes answer to their own identifier.
    pub fn port(&self, name: &str, direction: Direction) -> Result<Port> {
        self.ports_towards(direction)
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| GraphError::UnknownPort {
                node: self.id().to_string(),
                port: name.to_string(),
                direction,
            })
    }

    /// The single port of a direction, used when an endpoint names no port.
    pub fn default_port(&self, direction: Direction) -> Result<Port> {
        let mut ports = self.ports_towards(direction);
        match ports.len() {
            0 => Err(GraphError::NoPort {
                node: self.id().to_string(),
                direction,
            }),
            1 => Ok(ports.remove(0)),
            _ => Err(GraphError::AmbiguousPort {
                node: self.id().to_string(),
                direction,
                candidates: ports.into_iter().map(|p| p.name).collect(),
            }),
        }
    }
}

/// Handle to a node registered in a [`WorkflowDraft`](super::WorkflowDraft).
///
/// Handles remember which draft issued them, so a node from one draft
/// cannot be wired into another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub(crate) graph: u64,
    pub(crate) id: String,
    pub(crate) kind: NodeKind,
}

impl NodeRef {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The node itself, letting the resolver pick the port.
    pub fn endpoint(&self) -> EndpointSpec {
        EndpointSpec::NodeOnly(self.clone())
    }

    /// A named port of the node.
    pub fn port(&self, name: impl Into<String>) -> EndpointSpec {
        EndpointSpec::NodeAndPort(self.clone(), name.into())
    }
}
