//! `align -> markDuplicates`, checked against the parsed CWL document.

use rustweaver::catalog::{ToolCatalog, ToolDefinition, ToolInput, ToolOutput};
use rustweaver::translation::{translate, TranslationFormat, TranslationOptions};
use rustweaver::types::DataType;
use rustweaver::workflow::{Input, Output, WorkflowDraft};
use rustweaver::GraphError;
use serde_yaml::Value;

fn bwa_align() -> ToolDefinition {
    ToolDefinition::new("BwaAlign", ["bwa", "mem"])
        .with_input(ToolInput::new("reads", DataType::array(DataType::Fastq)).position(2))
        .with_input(ToolInput::new("reference", DataType::FastaWithDict).position(1))
        .with_output(ToolOutput::new("output", DataType::Bam).glob("aligned.bam"))
}

fn two_step() -> WorkflowDraft {
    let catalog = ToolCatalog::builtin();
    let mut w = WorkflowDraft::new("two_step");

    let align = w.add_step("align", bwa_align()).unwrap();
    let mark_dup = w
        .add_step("markDuplicates", catalog.get("Gatk4MarkDuplicates").unwrap())
        .unwrap();
    w.add_edge(align.port("output"), mark_dup.port("input")).unwrap();
    w.add_default_value(mark_dup.port("createIndex"), true).unwrap();

    let metrics = w.add_output(Output::new("markDup_metrics")).unwrap();
    w.add_edge(mark_dup.port("metrics"), &metrics).unwrap();
    w
}

fn parse(content: &str) -> Value {
    serde_yaml::from_str(content).unwrap()
}

fn seq<'a>(value: &'a Value, key: &str) -> &'a Vec<Value> {
    value[key].as_sequence().unwrap()
}

#[test]
fn test_two_step_document_shape() {
    let translation = two_step()
        .translate(TranslationFormat::Cwl, &TranslationOptions::default())
        .unwrap();
    let doc = parse(&translation.main.content);

    assert_eq!(doc["class"].as_str(), Some("Workflow"));
    assert_eq!(doc["cwlVersion"].as_str(), Some("v1.0"));

    let steps = seq(&doc, "steps");
    assert_eq!(steps.len(), 2);

    let bindings: Vec<&Value> = steps.iter().flat_map(|s| seq(s, "in")).collect();
    let edges: Vec<&Value> = bindings
        .iter()
        .copied()
        .filter(|b| !b["source"].is_null())
        .collect();
    let defaults: Vec<&Value> = bindings
        .iter()
        .copied()
        .filter(|b| !b["default"].is_null())
        .collect();

    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["id"].as_str(), Some("input"));
    assert_eq!(edges[0]["source"].as_str(), Some("align/output"));

    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"].as_str(), Some("createIndex"));
    assert_eq!(defaults[0]["default"].as_bool(), Some(true));

    let outputs = seq(&doc, "outputs");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0]["id"].as_str(), Some("markDup_metrics"));
    assert_eq!(
        outputs[0]["outputSource"].as_str(),
        Some("markDuplicates/metrics")
    );
    assert_eq!(outputs[0]["type"].as_str(), Some("File"));
}

#[test]
fn test_tool_documents_carry_bindings() {
    let translation = two_step()
        .translate(TranslationFormat::Cwl, &TranslationOptions::default())
        .unwrap();

    let align = translation.tools.iter().find(|d| d.name == "BwaAlign").unwrap();
    let doc = parse(&align.content);

    assert_eq!(doc["class"].as_str(), Some("CommandLineTool"));
    assert_eq!(seq(&doc, "baseCommand").len(), 2);

    let reference = &seq(&doc, "inputs")[1];
    assert_eq!(reference["inputBinding"]["position"].as_i64(), Some(1));
    assert_eq!(seq(reference, "secondaryFiles").len(), 2);
}

#[test]
fn test_unregistered_destination_leaves_edges_unchanged() {
    let mut w = two_step();
    let mut elsewhere = WorkflowDraft::new("elsewhere");
    let ghost = elsewhere.add_step("ghost", bwa_align()).unwrap();
    let reference = w
        .add_input(Input::new("reference", DataType::FastaWithDict))
        .unwrap();

    let before = w.edges().to_vec();
    let result = w.add_edge(&reference, ghost.port("reference"));

    assert!(matches!(result, Err(GraphError::UnknownNode { ref node, .. }) if node == "ghost"));
    assert_eq!(w.edges(), before.as_slice());
}
