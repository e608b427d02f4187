//! Ports and Port Schemas
//!
//! A port is a named, typed, directional attachment point on a node.
//! Steps take their ports from the [`HasPortSchema`] of whatever they wrap,
//! which is either a catalog tool or a compiled sub-workflow.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DataType;

/// Which way data flows through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("input"),
            Direction::Out => f.write_str("output"),
        }
    }
}

/// One entry of a tool or workflow port schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    /// Optional ports may be left unbound
    #[serde(default)]
    pub optional: bool,

    /// Array ports that take one element per incoming edge
    #[serde(default)]
    pub accumulate: bool,

    /// Built-in default of the tool (or workflow input)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            optional: false,
            accumulate: false,
            default: None,
        }
    }

    /// A port must be bound unless it is optional or carries a default.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// Anything that can be wrapped by a step.
///
/// Implemented by catalog [`ToolDefinition`](crate::catalog::ToolDefinition)s
/// and by [`CompiledWorkflow`](crate::workflow::CompiledWorkflow)s.
pub trait HasPortSchema {
    /// Identifier of the wrapped definition (tool id or workflow name).
    fn schema_id(&self) -> &str;

    fn input_ports(&self) -> Vec<PortSpec>;

    fn output_ports(&self) -> Vec<PortSpec>;
}

/// A resolved port on a concrete node.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub node: String,
    pub name: String,
    pub direction: Direction,
    /// `None` for outputs whose type is inferred from their source.
    pub data_type: Option<DataType>,
    pub optional: bool,
    pub accumulate: bool,
    /// Synthetic port of an Input or Output node.
    pub implicit: bool,
}

impl Port {
    pub(crate) fn from_spec(node: &str, spec: &PortSpec, direction: Direction) -> Self {
        Self {
            node: node.to_string(),
            name: spec.name.clone(),
            direction,
            data_type: Some(spec.data_type.clone()),
            optional: spec.optional,
            accumulate: spec.accumulate,
            implicit: false,
        }
    }

    /// Reference to this port as stored on edges.
    pub fn reference(&self) -> PortRef {
        PortRef {
            node: self.node.clone(),
            port: (!self.implicit).then(|| self.name.clone()),
        }
    }

    /// Whether this (input) port can receive a value from `source`.
    ///
    /// Untyped ports accept anything. Accumulating ports also accept a
    /// single element of their array type.
    pub fn accepts(&self, source: &Port) -> bool {
        match (&self.data_type, &source.data_type) {
            (None, _) | (_, None) => true,
            (Some(dest), Some(src)) if self.accumulate => dest.accepts_element(src),
            (Some(dest), Some(src)) => dest.accepts(src),
        }
    }
}

/// A (node, port) pair identifying one end of an edge.
///
/// Input and Output nodes have a single implicit port, referenced with
/// `port: None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: String,
    pub port: Option<String>,
}

impl PortRef {
    pub fn step(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: Some(port.into()),
        }
    }

    pub fn node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: None,
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "{}/{}", self.node, port),
            None => f.write_str(&self.node),
        }
    }
}
