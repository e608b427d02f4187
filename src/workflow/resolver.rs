//! Edge Resolution
//!
//! Turns loosely specified edge endpoints (a bare node, or a node plus a
//! port name) into an exact pair of ports and type-checks the pair.
//!
//! When an endpoint names no port and its node has several ports of the
//! required direction, candidates are narrowed in order:
//!
//! 1. type compatibility with the opposite endpoint,
//! 2. name: the destination port is named like the source node or source
//!    port (`reference -> baseRecal` picks `baseRecal/reference`),
//! 3. for a bare step feeding an untyped workflow Output, the step's
//!    primary output, which is its first declared output port.
//!
//! Anything still ambiguous is an error naming the candidates.

use log::debug;

use super::node::{Node, NodeRef};
use super::port::{Direction, Port};
use crate::error::{GraphError, Result};

/// One end of an edge as written by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSpec {
    NodeOnly(NodeRef),
    NodeAndPort(NodeRef, String),
}

impl EndpointSpec {
    pub fn node(&self) -> &NodeRef {
        match self {
            EndpointSpec::NodeOnly(node) | EndpointSpec::NodeAndPort(node, _) => node,
        }
    }

    pub fn port_name(&self) -> Option<&str> {
        match self {
            EndpointSpec::NodeOnly(_) => None,
            EndpointSpec::NodeAndPort(_, port) => Some(port),
        }
    }
}

impl From<&NodeRef> for EndpointSpec {
    fn from(node: &NodeRef) -> Self {
        EndpointSpec::NodeOnly(node.clone())
    }
}

impl From<NodeRef> for EndpointSpec {
    fn from(node: NodeRef) -> Self {
        EndpointSpec::NodeOnly(node)
    }
}

/// A fully resolved, type-checked connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEdge {
    pub source: Port,
    pub destination: Port,
}

/// Candidate ports of one endpoint.
fn candidates(node: &Node, port: Option<&str>, direction: Direction) -> Result<Vec<Port>> {
    match port {
        Some(name) => Ok(vec![node.port(name, direction)?]),
        None => {
            let ports = node.ports_towards(direction);
            if ports.is_empty() {
                return Err(GraphError::NoPort {
                    node: node.id().to_string(),
                    direction,
                });
            }
            Ok(ports)
        }
    }
}

fn check_types(source: &Port, destination: &Port) -> Result<()> {
    if destination.accepts(source) {
        return Ok(());
    }

    match (&source.data_type, &destination.data_type) {
        (Some(source_type), Some(destination_type)) => Err(GraphError::TypeMismatch {
            source_port: source.reference().to_string(),
            source_type: source_type.clone(),
            destination: destination.reference().to_string(),
            destination_type: destination_type.clone(),
        }),
        // Untyped ports accept everything, so this arm is unreachable in practice.
        _ => Ok(()),
    }
}

/// Port names match when the destination is named after the source.
fn names_match(source: &Port, destination: &Port) -> bool {
    destination.name == source.node
        || (!source.implicit && destination.name == source.name)
        || (destination.implicit && destination.node == source.name)
}

fn ambiguous(node: &Node, direction: Direction, ports: Vec<&Port>) -> GraphError {
    let mut names: Vec<String> = Vec::new();
    for port in ports {
        if !names.contains(&port.name) {
            names.push(port.name.clone());
        }
    }
    if names.is_empty() {
        names = node
            .ports_towards(direction)
            .into_iter()
            .map(|p| p.name)
            .collect();
    }

    GraphError::AmbiguousPort {
        node: node.id().to_string(),
        direction,
        candidates: names,
    }
}

/// Resolves both endpoints of an edge against their nodes.
pub fn resolve_edge(
    source_node: &Node,
    source_port: Option<&str>,
    destination_node: &Node,
    destination_port: Option<&str>,
) -> Result<ResolvedEdge> {
    let sources = candidates(source_node, source_port, Direction::Out)?;
    let destinations = candidates(destination_node, destination_port, Direction::In)?;

    if sources.len() == 1 && destinations.len() == 1 {
        let edge = ResolvedEdge {
            source: sources[0].clone(),
            destination: destinations[0].clone(),
        };
        check_types(&edge.source, &edge.destination)?;
        return Ok(edge);
    }

    let compatible: Vec<(&Port, &Port)> = sources
        .iter()
        .flat_map(|s| destinations.iter().map(move |d| (s, d)))
        .filter(|(s, d)| d.accepts(s))
        .collect();

    let chosen = if compatible.len() == 1 {
        Some(compatible[0])
    } else {
        let named: Vec<(&Port, &Port)> = compatible
            .iter()
            .copied()
            .filter(|(s, d)| names_match(s, d))
            .collect();

        if named.len() == 1 {
            Some(named[0])
        } else if destinations.len() == 1
            && destinations[0].implicit
            && destinations[0].data_type.is_none()
        {
            // Bare step into an untyped Output: primary output.
            compatible.first().copied()
        } else {
            None
        }
    };

    match chosen {
        Some((source, destination)) => {
            debug!(
                "Resolved edge {} -> {}",
                source.reference(),
                destination.reference()
            );
            Ok(ResolvedEdge {
                source: source.clone(),
                destination: destination.clone(),
            })
        }
        None if destinations.len() > 1 => Err(ambiguous(
            destination_node,
            Direction::In,
            compatible.iter().map(|(_, d)| *d).collect(),
        )),
        None => Err(ambiguous(
            source_node,
            Direction::Out,
            compatible.iter().map(|(s, _)| *s).collect(),
        )),
    }
}
