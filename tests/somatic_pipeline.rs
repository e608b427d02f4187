//! Tumor/normal somatic calling pipeline built from the public API: the
//! same preprocessing sub-workflow is nested twice and feeds Mutect2.

use std::sync::Arc;

use rustweaver::catalog::ToolCatalog;
use rustweaver::translation::{persist, translate, TranslationFormat, TranslationOptions};
use rustweaver::types::DataType;
use rustweaver::workflow::{CompiledWorkflow, HasPortSchema, Input, Output, WorkflowDraft};
use rustweaver::GraphError;

fn subpipeline(catalog: &ToolCatalog) -> CompiledWorkflow {
    let mut w = WorkflowDraft::new("somatic_subpipeline");

    let reference = w.add_input(Input::new("reference", DataType::FastaWithDict)).unwrap();
    let inputs = w.add_input(Input::new("inputs", DataType::array(DataType::Fastq))).unwrap();
    let known_sites = w
        .add_input(Input::new("knownSites", DataType::array(DataType::Vcf)).accumulating())
        .unwrap();
    let read_group = w
        .add_input(Input::new("read_group_header_line", DataType::String))
        .unwrap();
    let tmpdir = w.add_input(Input::new("tmpdir", DataType::Directory)).unwrap();

    let align = w
        .add_step("align_sortedbam", catalog.get("AlignSortedBam").unwrap())
        .unwrap();
    let merge = w
        .add_step("mergeSam", catalog.get("Gatk4MergeSamFiles").unwrap())
        .unwrap();
    let mark_dup = w
        .add_step("markDup", catalog.get("Gatk4MarkDuplicates").unwrap())
        .unwrap();
    let base_recal = w
        .add_step("baseRecal", catalog.get("Gatk4BaseRecalibrator").unwrap())
        .unwrap();
    let apply_bqsr = w
        .add_step("applyBQSR", catalog.get("Gatk4ApplyBqsr").unwrap())
        .unwrap();

    w.add_edges([
        (reference.endpoint(), align.endpoint()),
        (read_group.endpoint(), align.port("read_group_header_line")),
        (inputs.endpoint(), align.port("fastq")),
        (tmpdir.endpoint(), align.endpoint()),
    ])
    .unwrap();

    w.add_edges([
        (align.port("o3_sortsam"), merge.port("input")),
        (tmpdir.endpoint(), merge.port("tmpDir")),
    ])
    .unwrap();
    w.add_default_value(merge.port("createIndex"), true).unwrap();
    w.add_default_value(merge.port("useThreading"), true).unwrap();
    w.add_default_value(merge.port("maxRecordsInRam"), 5_000_000).unwrap();
    w.add_default_value(merge.port("validationStringency"), "SILENT").unwrap();

    w.add_edges([
        (merge.port("output"), mark_dup.port("input")),
        (tmpdir.endpoint(), mark_dup.port("tmpDir")),
    ])
    .unwrap();
    w.add_default_value(mark_dup.port("createIndex"), true).unwrap();
    w.add_default_value(mark_dup.port("maxRecordsInRam"), 5_000_000).unwrap();

    w.add_edges([
        (mark_dup.port("output"), base_recal.port("input")),
        (tmpdir.endpoint(), base_recal.port("tmpDir")),
        (reference.endpoint(), base_recal.port("reference")),
        (known_sites.endpoint(), base_recal.port("knownSites")),
    ])
    .unwrap();

    w.add_edges([
        (reference.endpoint(), apply_bqsr.port("reference")),
        (base_recal.port("output"), apply_bqsr.port("recalFile")),
        (mark_dup.port("output"), apply_bqsr.port("input")),
        (tmpdir.endpoint(), apply_bqsr.port("tmpDir")),
    ])
    .unwrap();

    let output_bam = w.add_output(Output::new("output_bam")).unwrap();
    let metrics = w.add_output(Output::new("markDup_metrics")).unwrap();
    let recal_table = w.add_output(Output::new("recal_table")).unwrap();
    w.add_edges([
        (apply_bqsr.endpoint(), output_bam.endpoint()),
        (mark_dup.port("metrics"), metrics.endpoint()),
        (base_recal.endpoint(), recal_table.endpoint()),
    ])
    .unwrap();

    w.compile().unwrap()
}

fn somatic_pipeline() -> CompiledWorkflow {
    let catalog = ToolCatalog::builtin();
    let sub = Arc::new(subpipeline(&catalog));
    let mut w = WorkflowDraft::new("somatic_pipeline");

    let normal_inputs = w
        .add_input(Input::new("normalInputs", DataType::array(DataType::Fastq)))
        .unwrap();
    let tumor_inputs = w
        .add_input(Input::new("tumorInputs", DataType::array(DataType::Fastq)))
        .unwrap();
    let normal_header = w
        .add_input(Input::new("normal_read_group_header_line", DataType::String))
        .unwrap();
    let tumor_header = w
        .add_input(Input::new("tumor_read_group_header_line", DataType::String))
        .unwrap();
    let reference = w.add_input(Input::new("reference", DataType::FastaWithDict)).unwrap();
    let db_snp = w.add_input(Input::new("dbSNP", DataType::VcfIdx)).unwrap();
    let g1000 = w.add_input(Input::new("1000GP", DataType::VcfTabix)).unwrap();
    let omni = w.add_input(Input::new("OMNI", DataType::VcfTabix)).unwrap();
    let hapmap = w.add_input(Input::new("HAPMAP", DataType::VcfTabix)).unwrap();
    let tmpdir = w.add_input(Input::new("tmpdir", DataType::Directory)).unwrap();

    let tumor = w.add_step("tumor", Arc::clone(&sub)).unwrap();
    let normal = w.add_step("normal", Arc::clone(&sub)).unwrap();
    let mutect = w
        .add_step("mutect", catalog.get("GatkMutect2").unwrap())
        .unwrap();

    for (step, reads, header) in [
        (&tumor, &tumor_inputs, &tumor_header),
        (&normal, &normal_inputs, &normal_header),
    ] {
        w.add_edges([
            (reference.endpoint(), step.port("reference")),
            (header.endpoint(), step.port("read_group_header_line")),
            (reads.endpoint(), step.port("inputs")),
            (tmpdir.endpoint(), step.port("tmpdir")),
            (g1000.endpoint(), step.port("knownSites")),
            (db_snp.endpoint(), step.port("knownSites")),
            (hapmap.endpoint(), step.port("knownSites")),
            (omni.endpoint(), step.port("knownSites")),
        ])
        .unwrap();
    }

    w.add_edges([
        (reference.endpoint(), mutect.endpoint()),
        (tumor.endpoint(), mutect.port("tumor")),
        (normal.endpoint(), mutect.port("normal")),
    ])
    .unwrap();

    let tumor_name = w.add_input(Input::new("tumorName", DataType::String)).unwrap();
    let normal_name = w.add_input(Input::new("normalName", DataType::String)).unwrap();
    w.add_edge(&tumor_name, mutect.port("tumorName")).unwrap();
    w.add_edge(&normal_name, mutect.port("normalName")).unwrap();

    let vcf = w.add_output(Output::new("somatic_vcf")).unwrap();
    w.add_edge(&mutect, &vcf).unwrap();

    w.compile().unwrap()
}

#[test]
fn test_subpipeline_schema() {
    let sub = subpipeline(&ToolCatalog::builtin());

    let inputs: Vec<String> = sub.input_ports().into_iter().map(|p| p.name).collect();
    assert_eq!(
        inputs,
        vec!["reference", "inputs", "knownSites", "read_group_header_line", "tmpdir"]
    );

    let outputs: Vec<(String, DataType)> = sub
        .output_ports()
        .into_iter()
        .map(|p| (p.name, p.data_type))
        .collect();
    assert_eq!(
        outputs,
        vec![
            ("output_bam".to_string(), DataType::IndexedBam),
            ("markDup_metrics".to_string(), DataType::TextFile),
            ("recal_table".to_string(), DataType::Tsv),
        ]
    );

    assert_eq!(
        sub.topological_steps().unwrap(),
        vec!["align_sortedbam", "mergeSam", "markDup", "baseRecal", "applyBQSR"]
    );
}

#[test]
fn test_somatic_pipeline_translation() {
    let pipeline = somatic_pipeline();
    let translation =
        translate(&pipeline, TranslationFormat::Cwl, &TranslationOptions::default()).unwrap();

    // One sub-workflow document despite two steps using it.
    assert_eq!(translation.subworkflows.len(), 1);
    assert_eq!(translation.tools.len(), 6);

    let main = &translation.main.content;
    assert!(main.starts_with("#!/usr/bin/env cwl-runner"));
    assert!(main.contains("class: Workflow"));
    assert!(main.contains("cwlVersion: v1.0"));
    assert!(main.contains("SubworkflowFeatureRequirement"));
    assert!(main.contains("MultipleInputFeatureRequirement"));
    assert!(main.contains("linkMerge: merge_flattened"));
    assert!(main.contains("run: subworkflows/somatic_subpipeline.cwl"));
    assert!(main.contains("run: tools/GatkMutect2.cwl"));
    assert!(main.contains("source: tumor/output_bam"));
    assert!(main.contains("outputSource: mutect/output"));
    assert!(!main.contains("DockerRequirement"));

    let doc: serde_yaml::Value = serde_yaml::from_str(main).unwrap();
    let steps = doc["steps"].as_sequence().unwrap();
    let binding = |step_id: &str, port: &str| {
        let step = steps.iter().find(|s| s["id"].as_str() == Some(step_id)).unwrap();
        step["in"]
            .as_sequence()
            .unwrap()
            .iter()
            .find(|b| b["id"].as_str() == Some(port))
            .cloned()
            .unwrap()
    };

    // knownSites sources keep the order the edges were added in.
    for step_id in ["tumor", "normal"] {
        let known_sites = binding(step_id, "knownSites");
        let sources: Vec<&str> = known_sites["source"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        assert_eq!(sources, vec!["1000GP", "dbSNP", "HAPMAP", "OMNI"]);
        assert_eq!(known_sites["linkMerge"].as_str(), Some("merge_flattened"));
    }

    // Both nested steps run the same document with their own bindings.
    for (step_id, reads) in [("tumor", "tumorInputs"), ("normal", "normalInputs")] {
        let step = steps.iter().find(|s| s["id"].as_str() == Some(step_id)).unwrap();
        assert_eq!(step["run"].as_str(), Some("subworkflows/somatic_subpipeline.cwl"));
        assert_eq!(binding(step_id, "inputs")["source"].as_str(), Some(reads));
    }

    let sub = &translation.subworkflows[0].content;
    assert!(sub.contains("run: ../tools/Gatk4BaseRecalibrator.cwl"));
    assert!(sub.contains("validationStringency"));
    assert!(sub.contains("SILENT"));
}

#[test]
fn test_translation_is_deterministic() {
    let options = TranslationOptions::default();
    let first = translate(&somatic_pipeline(), TranslationFormat::Cwl, &options).unwrap();
    let second = translate(&somatic_pipeline(), TranslationFormat::Cwl, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_with_docker_adds_containers() {
    let options = TranslationOptions {
        with_docker: true,
        ..Default::default()
    };
    let translation = translate(&somatic_pipeline(), TranslationFormat::Cwl, &options).unwrap();

    let mutect = translation
        .tools
        .iter()
        .find(|d| d.name == "GatkMutect2")
        .unwrap();
    assert!(mutect.content.contains("DockerRequirement"));
    assert!(mutect.content.contains("broadinstitute/gatk:4.0.12.0"));
}

#[test]
fn test_persist_somatic_pipeline() {
    let temp_dir = tempfile::tempdir().unwrap();
    let translation = translate(
        &somatic_pipeline(),
        TranslationFormat::Cwl,
        &TranslationOptions::default(),
    )
    .unwrap();

    let written = persist(&translation, temp_dir.path()).unwrap();
    assert_eq!(written.len(), 8);
    assert!(temp_dir.path().join("somatic_pipeline.cwl").is_file());
    assert!(temp_dir
        .path()
        .join("subworkflows/somatic_subpipeline.cwl")
        .is_file());
    assert!(temp_dir.path().join("tools/AlignSortedBam.cwl").is_file());
}

#[test]
fn test_edge_to_unregistered_step_fails() {
    let catalog = ToolCatalog::builtin();
    let mut other = WorkflowDraft::new("other");
    let stray = other
        .add_step("mutect", catalog.get("GatkMutect2").unwrap())
        .unwrap();

    let mut w = WorkflowDraft::new("w");
    let reference = w.add_input(Input::new("reference", DataType::FastaWithDict)).unwrap();

    let result = w.add_edge(&reference, &stray);
    assert!(matches!(result, Err(GraphError::UnknownNode { .. })));
    assert!(w.edges().is_empty());
}
