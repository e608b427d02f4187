//! Error Types
//!
//! Every structural error is raised by the `add_*` call that caused it, so
//! a draft never holds an invalid mutation. Translation only adds
//! persistence and serialization failures on top of these.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::DataType;
use crate::workflow::port::Direction;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors produced while building, compiling, translating or persisting a workflow.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two nodes in one workflow share an identifier.
    #[error("workflow '{workflow}' already has a node named '{identifier}'")]
    DuplicateIdentifier { workflow: String, identifier: String },

    #[error("'{0}' is not a valid identifier (use letters, digits and underscores)")]
    InvalidIdentifier(String),

    /// An endpoint refers to a node that was never registered in this workflow.
    #[error("node '{node}' is not registered in workflow '{workflow}'")]
    UnknownNode { workflow: String, node: String },

    #[error("node '{node}' has no {direction} port named '{port}'")]
    UnknownPort {
        node: String,
        port: String,
        direction: Direction,
    },

    #[error("node '{node}' has no {direction} ports")]
    NoPort { node: String, direction: Direction },

    /// A bare node was given where several ports could match.
    #[error(
        "cannot infer which {direction} port of '{node}' to use, name one of: {}",
        candidates.join(", ")
    )]
    AmbiguousPort {
        node: String,
        direction: Direction,
        candidates: Vec<String>,
    },

    #[error("node '{node}' cannot be used as {role}")]
    InvalidDirection { node: String, role: &'static str },

    #[error(
        "type mismatch: '{source_port}' produces {source_type} but '{destination}' expects {destination_type}"
    )]
    TypeMismatch {
        source_port: String,
        source_type: DataType,
        destination: String,
        destination_type: DataType,
    },

    /// A non-accumulating input port received a second edge.
    #[error("'{destination}' is already bound to '{existing}', cannot also bind '{source_port}'")]
    DuplicatePortBinding {
        destination: String,
        existing: String,
        source_port: String,
    },

    #[error("edge '{source_port}' -> '{destination}' would create a cycle")]
    CycleDetected {
        source_port: String,
        destination: String,
    },

    #[error("default value {value} does not fit '{port}' of type {expected}")]
    InvalidDefault {
        port: String,
        expected: DataType,
        value: serde_json::Value,
    },

    #[error("'{port}' already has an incoming edge, a default value would be ignored")]
    DefaultOnBoundPort { port: String },

    #[error("workflow '{workflow}' has unwired outputs: {}", outputs.join(", "))]
    IncompleteGraph {
        workflow: String,
        outputs: Vec<String>,
    },

    #[error("unsupported translation format '{0}'")]
    UnsupportedFormat(String),

    /// Two different documents would be written under the same name.
    #[error("two different definitions translate to the document '{0}'")]
    ConflictingDocument(String),

    #[error("failed to write '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document '{document}': {source}")]
    Serialization {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("tool '{0}' is not in the catalog")]
    UnknownTool(String),

    #[error("invalid data type '{0}'")]
    InvalidType(String),

    /// Malformed manifest or catalog file.
    #[error("{0}")]
    Manifest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_names_both_ends() {
        let err = GraphError::TypeMismatch {
            source_port: "reference".to_string(),
            source_type: DataType::FastaWithDict,
            destination: "markDuplicates/input".to_string(),
            destination_type: DataType::Bam,
        };
        let message = err.to_string();

        assert!(message.contains("reference"));
        assert!(message.contains("FastaWithDict"));
        assert!(message.contains("markDuplicates/input"));
        assert!(message.contains("Bam"));
    }

    #[test]
    fn test_ambiguous_port_lists_candidates() {
        let err = GraphError::AmbiguousPort {
            node: "mergeSam".to_string(),
            direction: Direction::In,
            candidates: vec!["input".to_string(), "tmpDir".to_string()],
        };
        assert!(err.to_string().contains("input, tmpDir"));
    }

    #[test]
    fn test_incomplete_graph_lists_outputs() {
        let err = GraphError::IncompleteGraph {
            workflow: "w".to_string(),
            outputs: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().ends_with("a, b"));
    }
}
