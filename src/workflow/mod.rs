//! Workflow Definition Module
//!
//! Provides the typed graph a workflow is built from, and the rules that
//! keep it valid while it is being built.
//!
//! # Structure
//!
//! - [`node`]: Input, Output and Step nodes, and the handles returned for them
//! - [`port`]: Ports, port schemas and port references
//! - [`resolver`]: Turns loosely specified edge endpoints into exact ports
//! - [`builder`]: `WorkflowDraft` and the `CompiledWorkflow` it produces
//! - [`validator`]: Whole-graph checks and dependency ordering
//! - [`manifest`]: YAML loading

pub mod builder;
pub mod manifest;
pub mod node;
pub mod port;
pub mod resolver;
pub mod validator;

pub use builder::{CompiledWorkflow, DefaultValue, Edge, WorkflowDraft};
pub use manifest::{load_manifest, LoadedManifest, Manifest};
pub use node::{Input, Node, NodeKind, NodeRef, Output, Step, StepTool};
pub use port::{Direction, HasPortSchema, Port, PortRef, PortSpec};
pub use resolver::EndpointSpec;
