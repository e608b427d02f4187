//! Workflow Graph Builder
//!
//! A [`WorkflowDraft`] accumulates nodes, edges and default values, and
//! rejects every invalid mutation at the call that attempts it. Compiling a
//! draft yields an immutable [`CompiledWorkflow`] that exposes a port
//! schema and can be embedded as a step of another draft.
//!
//! # Example
//!
//! ```
//! use rustweaver::catalog::ToolCatalog;
//! use rustweaver::types::DataType;
//! use rustweaver::workflow::{Input, Output, WorkflowDraft};
//!
//! fn main() -> Result<(), rustweaver::GraphError> {
//!     let catalog = ToolCatalog::builtin();
//!     let mut w = WorkflowDraft::new("dedup");
//!
//!     let bam = w.add_input(Input::new("bam", DataType::Bam))?;
//!     let mark_dup = w.add_step("markDuplicates", catalog.get("Gatk4MarkDuplicates")?)?;
//!     let metrics = w.add_output(Output::new("metrics"))?;
//!
//!     w.add_edge(&bam, mark_dup.port("input"))?;
//!     w.add_edge(mark_dup.port("metrics"), &metrics)?;
//!     w.add_default_value(mark_dup.port("createIndex"), true)?;
//!
//!     let compiled = w.compile()?;
//!     assert_eq!(compiled.edges().len(), 2);
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use serde_json::Value;

use super::node::{validate_identifier, Input, Node, NodeKind, NodeRef, Output, Step, StepTool};
use super::port::{Direction, HasPortSchema, PortRef, PortSpec};
use super::resolver::{resolve_edge, EndpointSpec};
use super::validator;
use crate::error::{GraphError, Result};
use crate::translation::{self, Translation, TranslationFormat, TranslationOptions};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// A validated connection between two ports.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: PortRef,
    pub destination: PortRef,
}

/// A literal bound to an unwired step input.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub port: PortRef,
    pub value: Value,
}

/// Nodes, edges and defaults in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Graph {
    pub(crate) nodes: Vec<Node>,
    index: HashMap<String, usize>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) defaults: Vec<DefaultValue>,
}

impl Graph {
    pub(crate) fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index.get(id).map(|&i| &mut self.nodes[i])
    }

    fn insert(&mut self, node: Node) {
        self.index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
    }

    pub(crate) fn incoming(&self, port: &PortRef) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.destination == *port)
            .collect()
    }

    pub(crate) fn default_for(&self, port: &PortRef) -> Option<&Value> {
        self.defaults
            .iter()
            .find(|d| d.port == *port)
            .map(|d| &d.value)
    }

    /// Whether `to` can be reached from `from` by following edges.
    pub(crate) fn reaches(&self, from: &str, to: &str) -> bool {
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            for edge in self.edges.iter().filter(|e| e.source.node == current) {
                queue.push_back(edge.destination.node.as_str());
            }
        }
        false
    }

    pub(crate) fn inputs(&self) -> impl Iterator<Item = &Input> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Input(input) => Some(input),
            _ => None,
        })
    }

    pub(crate) fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Output(output) => Some(output),
            _ => None,
        })
    }

    pub(crate) fn steps(&self) -> impl Iterator<Item = &Step> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Step(step) => Some(step),
            _ => None,
        })
    }
}

/// A workflow under construction.
#[derive(Debug)]
pub struct WorkflowDraft {
    name: String,
    doc: Option<String>,
    graph_id: u64,
    graph: Graph,
}

impl WorkflowDraft {
    /// Creates an empty draft.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            doc: None,
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            graph: Graph::default(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.graph.edges
    }

    pub fn defaults(&self) -> &[DefaultValue] {
        &self.graph.defaults
    }

    /// Returns the handle of a registered node.
    pub fn handle(&self, id: &str) -> Option<NodeRef> {
        self.graph.node(id).map(|node| self.node_ref(node.id(), node.kind()))
    }

    fn node_ref(&self, id: &str, kind: NodeKind) -> NodeRef {
        NodeRef {
            graph: self.graph_id,
            id: id.to_string(),
            kind,
        }
    }

    fn register(&mut self, node: Node) -> Result<NodeRef> {
        validate_identifier(node.id())?;

        if self.graph.node(node.id()).is_some() {
            return Err(GraphError::DuplicateIdentifier {
                workflow: self.name.clone(),
                identifier: node.id().to_string(),
            });
        }

        let handle = self.node_ref(node.id(), node.kind());
        debug!("Workflow '{}': added {} '{}'", self.name, handle.kind, handle.id);
        self.graph.insert(node);
        Ok(handle)
    }

    /// Declares a workflow input.
    pub fn add_input(&mut self, input: Input) -> Result<NodeRef> {
        input.validate()?;
        self.register(Node::Input(input))
    }

    /// Declares a workflow output.
    pub fn add_output(&mut self, output: Output) -> Result<NodeRef> {
        self.register(Node::Output(output))
    }

    /// Adds a step running a catalog tool or a compiled sub-workflow.
    ///
    /// Tools that bypassed the catalog are validated here.
    pub fn add_step(
        &mut self,
        id: impl Into<String>,
        tool: impl Into<StepTool>,
    ) -> Result<NodeRef> {
        let tool = tool.into();
        if let StepTool::Tool(definition) = &tool {
            definition.validate()?;
        }

        let step = Step {
            id: id.into().trim().to_string(),
            tool,
        };
        self.register(Node::Step(step))
    }

    fn lookup(&self, handle: &NodeRef) -> Result<&Node> {
        let unknown = || GraphError::UnknownNode {
            workflow: self.name.clone(),
            node: handle.id.clone(),
        };

        if handle.graph != self.graph_id {
            return Err(unknown());
        }
        self.graph.node(&handle.id).ok_or_else(unknown)
    }

    /// Connects two endpoints.
    ///
    /// The draft is left untouched when the edge is rejected.
    pub fn add_edge(
        &mut self,
        source: impl Into<EndpointSpec>,
        destination: impl Into<EndpointSpec>,
    ) -> Result<Edge> {
        let source = source.into();
        let destination = destination.into();

        let source_node = self.lookup(source.node())?;
        let destination_node = self.lookup(destination.node())?;

        if source_node.kind() == NodeKind::Output {
            return Err(GraphError::InvalidDirection {
                node: source_node.id().to_string(),
                role: "an edge source",
            });
        }
        if destination_node.kind() == NodeKind::Input {
            return Err(GraphError::InvalidDirection {
                node: destination_node.id().to_string(),
                role: "an edge destination",
            });
        }

        let resolved = resolve_edge(
            source_node,
            source.port_name(),
            destination_node,
            destination.port_name(),
        )?;
        let edge = Edge {
            source: resolved.source.reference(),
            destination: resolved.destination.reference(),
        };

        if let Some(existing) = self.graph.incoming(&edge.destination).first() {
            if !resolved.destination.accumulate {
                return Err(GraphError::DuplicatePortBinding {
                    destination: edge.destination.to_string(),
                    existing: existing.source.to_string(),
                    source_port: edge.source.to_string(),
                });
            }
        }

        if edge.source.node == edge.destination.node
            || self.graph.reaches(&edge.destination.node, &edge.source.node)
        {
            return Err(GraphError::CycleDetected {
                source_port: edge.source.to_string(),
                destination: edge.destination.to_string(),
            });
        }

        if let Some(Node::Output(output)) = self.graph.node_mut(&edge.destination.node) {
            if output.data_type.is_none() {
                output.data_type = resolved.source.data_type.clone();
            }
        }

        if let Some(position) = self
            .graph
            .defaults
            .iter()
            .position(|d| d.port == edge.destination)
        {
            let dropped = self.graph.defaults.remove(position);
            warn!(
                "Workflow '{}': '{}' is now wired from '{}', dropping its default value {}",
                self.name, edge.destination, edge.source, dropped.value
            );
        }

        debug!(
            "Workflow '{}': edge {} -> {}",
            self.name, edge.source, edge.destination
        );
        self.graph.edges.push(edge.clone());
        Ok(edge)
    }

    /// Connects several endpoint pairs, all or nothing.
    pub fn add_edges<I>(&mut self, edges: I) -> Result<()>
    where
        I: IntoIterator<Item = (EndpointSpec, EndpointSpec)>,
    {
        let snapshot = self.graph.clone();

        for (source, destination) in edges {
            if let Err(e) = self.add_edge(source, destination) {
                self.graph = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Sets a literal for an unwired step input, replacing any earlier one.
    pub fn add_default_value(
        &mut self,
        port: impl Into<EndpointSpec>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let spec = port.into();
        let value = value.into();
        let node = self.lookup(spec.node())?;

        if node.kind() != NodeKind::Step {
            return Err(GraphError::InvalidDirection {
                node: node.id().to_string(),
                role: "a default value target",
            });
        }

        let port = match spec.port_name() {
            Some(name) => node.port(name, Direction::In)?,
            None => node.default_port(Direction::In)?,
        };
        let port_ref = port.reference();

        if let Some(expected) = &port.data_type {
            if !expected.accepts_value(&value) {
                return Err(GraphError::InvalidDefault {
                    port: port_ref.to_string(),
                    expected: expected.clone(),
                    value,
                });
            }
        }

        if !self.graph.incoming(&port_ref).is_empty() {
            return Err(GraphError::DefaultOnBoundPort {
                port: port_ref.to_string(),
            });
        }

        match self.graph.defaults.iter_mut().find(|d| d.port == port_ref) {
            Some(existing) => {
                debug!(
                    "Workflow '{}': default of '{}' changed from {} to {}",
                    self.name, port_ref, existing.value, value
                );
                existing.value = value;
            }
            None => {
                debug!("Workflow '{}': default '{}' = {}", self.name, port_ref, value);
                self.graph.defaults.push(DefaultValue {
                    port: port_ref,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Human readable findings that do not prevent compilation.
    pub fn lint(&self) -> Vec<String> {
        validator::lint(&self.name, &self.graph)
    }

    /// Step identifiers with every step after the steps it depends on.
    pub fn topological_steps(&self) -> Result<Vec<String>> {
        validator::topological_steps(&self.graph)
    }

    /// Freezes the draft into a workflow that can be translated or nested.
    pub fn compile(&self) -> Result<CompiledWorkflow> {
        validate_identifier(&self.name)?;
        validator::check_outputs_wired(&self.name, &self.graph)?;
        validator::topological_steps(&self.graph)?;

        for port in validator::unbound_required_inputs(&self.graph) {
            warn!(
                "Workflow '{}': required input '{}' has no edge and no default",
                self.name, port
            );
        }

        let inputs = self
            .graph
            .inputs()
            .map(|input| PortSpec {
                name: input.id.clone(),
                data_type: input.data_type.clone(),
                optional: input.default.is_some(),
                accumulate: input.accumulate,
                default: input.default.clone(),
            })
            .collect();

        let mut outputs = Vec::new();
        for output in self.graph.outputs() {
            let data_type = output
                .data_type
                .clone()
                .ok_or_else(|| GraphError::IncompleteGraph {
                    workflow: self.name.clone(),
                    outputs: vec![output.id.clone()],
                })?;
            outputs.push(PortSpec::new(output.id.clone(), data_type));
        }

        info!(
            "Compiled workflow '{}': {} nodes, {} edges, {} defaults",
            self.name,
            self.graph.nodes.len(),
            self.graph.edges.len(),
            self.graph.defaults.len()
        );

        Ok(CompiledWorkflow {
            name: self.name.clone(),
            doc: self.doc.clone(),
            graph: self.graph.clone(),
            inputs,
            outputs,
        })
    }

    /// Compiles and translates in one go.
    pub fn translate(
        &self,
        format: TranslationFormat,
        options: &TranslationOptions,
    ) -> Result<Translation> {
        let compiled = self.compile()?;
        translation::translate(&compiled, format, options)
    }
}

/// A finished workflow. Read-only; shared by reference when nested.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    name: String,
    doc: Option<String>,
    graph: Graph,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
}

impl CompiledWorkflow {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.graph.edges
    }

    pub fn defaults(&self) -> &[DefaultValue] {
        &self.graph.defaults
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Input> {
        self.graph.inputs()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.graph.outputs()
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.graph.steps()
    }

    /// Edges feeding a port, in the order they were added.
    pub fn incoming(&self, port: &PortRef) -> Vec<&Edge> {
        self.graph.incoming(port)
    }

    pub fn default_for(&self, port: &PortRef) -> Option<&Value> {
        self.graph.default_for(port)
    }

    pub fn topological_steps(&self) -> Result<Vec<String>> {
        validator::topological_steps(&self.graph)
    }

    pub fn lint(&self) -> Vec<String> {
        validator::lint(&self.name, &self.graph)
    }

    pub fn translate(
        &self,
        format: TranslationFormat,
        options: &TranslationOptions,
    ) -> Result<Translation> {
        translation::translate(self, format, options)
    }
}

impl HasPortSchema for CompiledWorkflow {
    fn schema_id(&self) -> &str {
        &self.name
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        self.inputs.clone()
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        self.outputs.clone()
    }
}
