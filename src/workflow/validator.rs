//! Workflow Validation
//!
//! Whole-graph checks that cannot run edge by edge:
//! - Every declared output is wired
//! - Dependency order between steps (no cycles)
//! - Required step inputs left without an edge or a default
//! - Lint findings for GUI/CLI feedback

use std::collections::{HashMap, VecDeque};

use log::debug;

use super::builder::Graph;
use super::node::Node;
use super::port::{Direction, HasPortSchema, PortRef};
use crate::error::{GraphError, Result};

/// Fails with `IncompleteGraph` naming every output without a source.
pub(crate) fn check_outputs_wired(workflow: &str, graph: &Graph) -> Result<()> {
    let unwired: Vec<String> = graph
        .outputs()
        .filter(|output| graph.incoming(&PortRef::node(output.id.as_str())).is_empty())
        .map(|output| output.id.clone())
        .collect();

    if unwired.is_empty() {
        Ok(())
    } else {
        Err(GraphError::IncompleteGraph {
            workflow: workflow.to_string(),
            outputs: unwired,
        })
    }
}

/// Required step inputs with no edge, no default, and no tool default.
pub(crate) fn unbound_required_inputs(graph: &Graph) -> Vec<PortRef> {
    let mut unbound = Vec::new();

    for node in &graph.nodes {
        if !matches!(node, Node::Step(_)) {
            continue;
        }
        for port in node.ports_towards(Direction::In) {
            let port_ref = port.reference();
            let tool_default = port_default(node, &port.name);
            if !port.optional
                && !tool_default
                && graph.incoming(&port_ref).is_empty()
                && graph.default_for(&port_ref).is_none()
            {
                unbound.push(port_ref);
            }
        }
    }

    unbound
}

fn port_default(node: &Node, port: &str) -> bool {
    match node {
        Node::Step(step) => step
            .tool
            .input_ports()
            .iter()
            .any(|spec| spec.name == port && spec.default.is_some()),
        _ => false,
    }
}

/// Orders steps so that every step follows the steps it consumes from,
/// using Kahn's algorithm. Ties keep insertion order.
pub(crate) fn topological_steps(graph: &Graph) -> Result<Vec<String>> {
    let steps: Vec<&str> = graph.steps().map(|s| s.id.as_str()).collect();

    // Build in-degree map over step-to-step edges
    let mut in_degree: HashMap<&str, usize> = steps.iter().map(|&id| (id, 0)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in &graph.edges {
        let from = edge.source.node.as_str();
        let to = edge.destination.node.as_str();
        if in_degree.contains_key(from) && in_degree.contains_key(to) {
            successors.entry(from).or_default().push(to);
            if let Some(degree) = in_degree.get_mut(to) {
                *degree += 1;
            }
        }
    }

    // Start with root steps (in-degree = 0)
    let mut queue: VecDeque<&str> = steps
        .iter()
        .copied()
        .filter(|id| in_degree[id] == 0)
        .collect();

    let mut sorted_order: Vec<String> = Vec::with_capacity(steps.len());

    while let Some(current) = queue.pop_front() {
        sorted_order.push(current.to_string());

        for &successor in successors.get(current).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(successor) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(successor);
                }
            }
        }
    }

    if sorted_order.len() != steps.len() {
        let stuck = graph
            .edges
            .iter()
            .find(|e| {
                !sorted_order.contains(&e.source.node)
                    && !sorted_order.contains(&e.destination.node)
            })
            .map(|e| (e.source.to_string(), e.destination.to_string()))
            .unwrap_or_default();

        return Err(GraphError::CycleDetected {
            source_port: stuck.0,
            destination: stuck.1,
        });
    }

    debug!("Topological order: {:?}", sorted_order);
    Ok(sorted_order)
}

/// Quick validation that returns a list of findings.
///
/// Useful for editor feedback: nothing here stops compilation.
pub(crate) fn lint(workflow: &str, graph: &Graph) -> Vec<String> {
    let mut findings = Vec::new();

    if graph.steps().next().is_none() {
        findings.push(format!("Workflow '{}' has no steps", workflow));
    }

    if let Err(e) = check_outputs_wired(workflow, graph) {
        findings.push(e.to_string());
    }

    for input in graph.inputs() {
        let used = graph.edges.iter().any(|e| e.source.node == input.id);
        if !used {
            findings.push(format!("Input '{}' is not connected to anything", input.id));
        }
    }

    for step in graph.steps() {
        let consumed = graph.edges.iter().any(|e| e.source.node == step.id);
        if !consumed {
            findings.push(format!("Step '{}': no output is used", step.id));
        }
    }

    for port in unbound_required_inputs(graph) {
        findings.push(format!(
            "Step '{}': required input '{}' has no edge and no default",
            port.node,
            port.port.as_deref().unwrap_or_default()
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use crate::catalog::{ToolDefinition, ToolInput, ToolOutput};
    use crate::types::DataType;
    use crate::workflow::{Input, Output, WorkflowDraft};

    fn sort() -> ToolDefinition {
        ToolDefinition::new("sort", ["sort"])
            .with_input(ToolInput::new("input", DataType::File))
            .with_input(ToolInput::new("buffer", DataType::Int))
            .with_input(ToolInput::new("threads", DataType::Int).default_value(1))
            .with_output(ToolOutput::new("output", DataType::File))
    }

    #[test]
    fn test_lint_empty_workflow() {
        let w = WorkflowDraft::new("empty");
        let findings = w.lint();

        assert!(!findings.is_empty());
        assert!(findings[0].contains("no steps"));
    }

    #[test]
    fn test_lint_reports_loose_ends() {
        let mut w = WorkflowDraft::new("w");
        w.add_input(Input::new("unused", DataType::String)).unwrap();
        let file = w.add_input(Input::new("file", DataType::File)).unwrap();
        let step = w.add_step("sort", sort()).unwrap();
        w.add_output(Output::new("never_wired")).unwrap();
        w.add_edge(&file, step.port("input")).unwrap();

        let findings = w.lint();
        assert!(findings.iter().any(|f| f.contains("'unused' is not connected")));
        assert!(findings.iter().any(|f| f.contains("never_wired")));
        assert!(findings.iter().any(|f| f.contains("no output is used")));
        assert!(findings.iter().any(|f| f.contains("'buffer' has no edge")));
        // Tool default covers `threads`
        assert!(!findings.iter().any(|f| f.contains("'threads'")));
    }

    #[test]
    fn test_lint_clean_workflow() {
        let mut w = WorkflowDraft::new("w");
        let file = w.add_input(Input::new("file", DataType::File)).unwrap();
        let step = w.add_step("sort", sort()).unwrap();
        let out = w.add_output(Output::new("sorted")).unwrap();
        w.add_edge(&file, step.port("input")).unwrap();
        w.add_default_value(step.port("buffer"), 1024).unwrap();
        w.add_edge(&step, &out).unwrap();

        assert!(w.lint().is_empty());
    }

    #[test]
    fn test_topological_steps_linear() {
        let mut w = WorkflowDraft::new("w");
        let file = w.add_input(Input::new("file", DataType::File)).unwrap();
        let third = w.add_step("third", sort()).unwrap();
        let first = w.add_step("first", sort()).unwrap();
        let second = w.add_step("second", sort()).unwrap();

        w.add_edge(&file, first.port("input")).unwrap();
        w.add_edge(&first, second.port("input")).unwrap();
        w.add_edge(&second, third.port("input")).unwrap();

        assert_eq!(w.topological_steps().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_topological_steps_independent_keep_order() {
        let mut w = WorkflowDraft::new("w");
        w.add_step("b", sort()).unwrap();
        w.add_step("a", sort()).unwrap();

        assert_eq!(w.topological_steps().unwrap(), vec!["b", "a"]);
    }
}
