//! CWL v1.0 Documents
//!
//! Serializable mirrors of the CWL `Workflow` and `CommandLineTool`
//! classes, and the conversion from compiled workflows and catalog tools.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{json, Value};

use super::{Document, DocumentSet, TranslationOptions};
use crate::catalog::{ToolDefinition, ToolInput, ToolOutput};
use crate::error::{GraphError, Result};
use crate::types::DataType;
use crate::workflow::{CompiledWorkflow, Direction, Node, PortRef, StepTool};

pub const CWL_VERSION: &str = "v1.0";
const SHEBANG: &str = "#!/usr/bin/env cwl-runner";

pub const TOOLS_DIR: &str = "tools";
pub const SUBWORKFLOWS_DIR: &str = "subworkflows";

/// A CWL type: a named type with optional `[]`/`?` shorthand, or the
/// record form needed for nested arrays.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum CwlType {
    Name(String),
    Array {
        #[serde(rename = "type")]
        kind: &'static str,
        items: Box<CwlType>,
    },
    Union(Vec<CwlType>),
}

fn base_name(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::String => "string",
        DataType::Int => "int",
        DataType::Float => "float",
        DataType::Boolean => "boolean",
        DataType::Directory => "Directory",
        DataType::Array(_) => "array",
        _ => "File",
    }
}

fn cwl_type(data_type: &DataType, optional: bool) -> CwlType {
    let required = match data_type {
        DataType::Array(item) if item.item().is_some() => CwlType::Array {
            kind: "array",
            items: Box::new(cwl_type(item, false)),
        },
        DataType::Array(item) => CwlType::Name(format!("{}[]", base_name(item))),
        other => CwlType::Name(base_name(other).to_string()),
    };

    match (optional, required) {
        (false, ty) => ty,
        (true, CwlType::Name(name)) => CwlType::Name(format!("{}?", name)),
        (true, ty) => CwlType::Union(vec![CwlType::Name("null".to_string()), ty]),
    }
}

/// Literal defaults for file-like ports become CWL `File` objects.
fn cwl_default(data_type: &DataType, value: &Value) -> Value {
    match (data_type, value) {
        (DataType::Directory, Value::String(path)) => {
            json!({ "class": "Directory", "path": path })
        }
        (ty, Value::String(path)) if ty.is_file() => json!({ "class": "File", "path": path }),
        (DataType::Array(item), Value::Array(values)) => {
            Value::Array(values.iter().map(|v| cwl_default(item, v)).collect())
        }
        _ => value.clone(),
    }
}

fn secondary_files(data_type: &DataType) -> Vec<String> {
    data_type
        .secondary_files()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Serialize, Debug)]
struct Requirement {
    class: &'static str,
    #[serde(rename = "dockerPull", skip_serializing_if = "Option::is_none")]
    docker_pull: Option<String>,
}

impl Requirement {
    fn class(class: &'static str) -> Self {
        Self {
            class,
            docker_pull: None,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WorkflowInput {
    id: String,
    #[serde(rename = "type")]
    cwl_type: CwlType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    secondary_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WorkflowOutput {
    id: String,
    #[serde(rename = "type")]
    cwl_type: CwlType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    secondary_files: Vec<String>,
    output_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum Source {
    One(String),
    Many(Vec<String>),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StepInput {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_merge: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

#[derive(Serialize, Debug)]
struct WorkflowStep {
    id: String,
    #[serde(rename = "in")]
    inputs: Vec<StepInput>,
    run: String,
    out: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CwlWorkflow {
    class: &'static str,
    cwl_version: &'static str,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    requirements: Vec<Requirement>,
    inputs: Vec<WorkflowInput>,
    outputs: Vec<WorkflowOutput>,
    steps: Vec<WorkflowStep>,
}

#[derive(Serialize, Debug)]
struct InputBinding {
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<i32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ToolInputDoc {
    id: String,
    #[serde(rename = "type")]
    cwl_type: CwlType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    secondary_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_binding: Option<InputBinding>,
}

#[derive(Serialize, Debug)]
struct OutputBinding {
    glob: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ToolOutputDoc {
    id: String,
    #[serde(rename = "type")]
    cwl_type: CwlType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    secondary_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_binding: Option<OutputBinding>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CwlTool {
    class: &'static str,
    cwl_version: &'static str,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    requirements: Vec<Requirement>,
    base_command: Vec<String>,
    inputs: Vec<ToolInputDoc>,
    outputs: Vec<ToolOutputDoc>,
}

fn render<T: Serialize>(name: &str, document: &T) -> Result<String> {
    let body = serde_yaml::to_string(document).map_err(|source| GraphError::Serialization {
        document: name.to_string(),
        source,
    })?;
    Ok(format!("{}\n\n{}", SHEBANG, body))
}

fn tool_input(input: &ToolInput) -> ToolInputDoc {
    let input_binding = if input.prefix.is_some() || input.position.is_some() {
        Some(InputBinding {
            prefix: input.prefix.clone(),
            position: input.position,
        })
    } else {
        None
    };

    ToolInputDoc {
        id: input.name.clone(),
        cwl_type: cwl_type(&input.data_type, input.optional),
        secondary_files: secondary_files(&input.data_type),
        default: input
            .default
            .as_ref()
            .map(|v| cwl_default(&input.data_type, v)),
        doc: input.doc.clone(),
        input_binding,
    }
}

fn tool_output(output: &ToolOutput) -> ToolOutputDoc {
    ToolOutputDoc {
        id: output.name.clone(),
        cwl_type: cwl_type(&output.data_type, false),
        secondary_files: secondary_files(&output.data_type),
        doc: output.doc.clone(),
        output_binding: output.glob.clone().map(|glob| OutputBinding { glob }),
    }
}

/// Renders a catalog tool as a `CommandLineTool` document.
pub fn tool_document(tool: &ToolDefinition, options: &TranslationOptions) -> Result<Document> {
    let mut requirements = Vec::new();
    if options.with_docker {
        if let Some(image) = &tool.container {
            requirements.push(Requirement {
                class: "DockerRequirement",
                docker_pull: Some(image.clone()),
            });
        }
    }

    let document = CwlTool {
        class: "CommandLineTool",
        cwl_version: CWL_VERSION,
        id: tool.id.clone(),
        label: tool.version.as_ref().map(|v| format!("{} v{}", tool.id, v)),
        doc: tool.doc.clone(),
        requirements,
        base_command: tool.base_command.clone(),
        inputs: tool.inputs.iter().map(tool_input).collect(),
        outputs: tool.outputs.iter().map(tool_output).collect(),
    };

    Ok(Document {
        name: tool.id.clone(),
        path: PathBuf::from(TOOLS_DIR).join(format!("{}.cwl", tool.id)),
        content: render(&tool.id, &document)?,
    })
}

/// Renders a compiled workflow, registering every tool and nested
/// workflow it runs in `documents`.
///
/// `nested` workflows live in the sub-workflow directory, which changes
/// the relative `run` paths of their steps.
pub fn workflow_document(
    workflow: &CompiledWorkflow,
    nested: bool,
    options: &TranslationOptions,
    documents: &mut DocumentSet,
) -> Result<Document> {
    let mut steps = Vec::new();
    let mut has_subworkflow = false;
    let mut has_multiple_sources = false;

    for node in workflow.nodes() {
        let Node::Step(step) = node else {
            continue;
        };

        let run = match &step.tool {
            StepTool::Tool(tool) => {
                documents.add_tool(tool_document(tool, options)?)?;
                if nested {
                    format!("../{}/{}.cwl", TOOLS_DIR, tool.id)
                } else {
                    format!("{}/{}.cwl", TOOLS_DIR, tool.id)
                }
            }
            StepTool::Workflow(inner) => {
                has_subworkflow = true;
                let document = workflow_document(inner, true, options, documents)?;
                documents.add_subworkflow(document)?;
                if nested {
                    format!("{}.cwl", inner.name())
                } else {
                    format!("{}/{}.cwl", SUBWORKFLOWS_DIR, inner.name())
                }
            }
        };

        let mut inputs = Vec::new();
        for port in node.ports_towards(Direction::In) {
            let reference = port.reference();
            let sources: Vec<String> = workflow
                .incoming(&reference)
                .iter()
                .map(|edge| edge.source.to_string())
                .collect();
            let default = workflow.default_for(&reference).map(|value| match &port.data_type {
                Some(ty) => cwl_default(ty, value),
                None => value.clone(),
            });

            let (source, link_merge) = match sources.len() {
                0 => (None, None),
                1 if !port.accumulate => (Some(Source::One(sources[0].clone())), None),
                _ => {
                    has_multiple_sources = true;
                    (Some(Source::Many(sources)), Some("merge_flattened"))
                }
            };

            if source.is_some() || default.is_some() {
                inputs.push(StepInput {
                    id: port.name,
                    source,
                    link_merge,
                    default,
                });
            }
        }

        steps.push(WorkflowStep {
            id: step.id.clone(),
            inputs,
            run,
            out: node
                .ports_towards(Direction::Out)
                .into_iter()
                .map(|p| p.name)
                .collect(),
        });
    }

    let mut requirements = Vec::new();
    if has_subworkflow {
        requirements.push(Requirement::class("SubworkflowFeatureRequirement"));
    }
    if has_multiple_sources {
        requirements.push(Requirement::class("MultipleInputFeatureRequirement"));
    }

    let inputs = workflow
        .inputs()
        .map(|input| WorkflowInput {
            id: input.id.clone(),
            cwl_type: cwl_type(&input.data_type, false),
            secondary_files: secondary_files(&input.data_type),
            default: input
                .default
                .as_ref()
                .map(|v| cwl_default(&input.data_type, v)),
            doc: input.doc.clone(),
        })
        .collect();

    let mut outputs = Vec::new();
    for output in workflow.outputs() {
        let reference = PortRef::node(output.id.as_str());
        let source = workflow
            .incoming(&reference)
            .first()
            .map(|edge| edge.source.to_string())
            .ok_or_else(|| GraphError::IncompleteGraph {
                workflow: workflow.name().to_string(),
                outputs: vec![output.id.clone()],
            })?;
        let data_type = output.data_type.clone().unwrap_or(DataType::File);

        outputs.push(WorkflowOutput {
            id: output.id.clone(),
            cwl_type: cwl_type(&data_type, false),
            secondary_files: secondary_files(&data_type),
            output_source: source,
            doc: output.doc.clone(),
        });
    }

    let document = CwlWorkflow {
        class: "Workflow",
        cwl_version: CWL_VERSION,
        id: workflow.name().to_string(),
        doc: workflow.doc().map(str::to_string),
        requirements,
        inputs,
        outputs,
        steps,
    };

    let file_name = format!("{}.cwl", workflow.name());
    let path = if nested {
        PathBuf::from(SUBWORKFLOWS_DIR).join(file_name)
    } else {
        PathBuf::from(file_name)
    };

    Ok(Document {
        name: workflow.name().to_string(),
        path,
        content: render(workflow.name(), &document)?,
    })
}
