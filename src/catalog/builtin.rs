//! Built-in Tool Definitions
//!
//! Port schemas for the alignment and GATK4 tools used by germline and
//! somatic preprocessing pipelines.

use once_cell::sync::Lazy;

use super::{ToolCatalog, ToolDefinition, ToolInput, ToolOutput};
use crate::types::DataType;

const GATK_IMAGE: &str = "broadinstitute/gatk:4.0.12.0";
const GATK_VERSION: &str = "4.0.12.0";

/// Shared catalog instance, built on first use.
pub static BUILTIN_CATALOG: Lazy<ToolCatalog> = Lazy::new(|| {
    let mut catalog = ToolCatalog::new();
    for tool in builtin_tools() {
        let id = tool.id.clone();
        if let Err(e) = catalog.register(tool) {
            panic!("built-in tool '{}' is invalid: {}", id, e);
        }
    }
    catalog
});

fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        align_sorted_bam(),
        merge_sam_files(),
        mark_duplicates(),
        base_recalibrator(),
        apply_bqsr(),
        mutect2(),
    ]
}

fn tmp_dir() -> ToolInput {
    ToolInput::new("tmpDir", DataType::Directory)
        .prefix("--TMP_DIR")
        .optional()
}

fn gatk(id: &str, command: &str) -> ToolDefinition {
    ToolDefinition::new(id, ["gatk", command])
        .with_version(GATK_VERSION)
        .with_container(GATK_IMAGE)
}

/// bwa mem | samtools view | gatk SortSam, as one step.
fn align_sorted_bam() -> ToolDefinition {
    ToolDefinition::new("AlignSortedBam", ["align_sortedbam.sh"])
        .with_version("1.0.0")
        .with_doc("Aligns paired reads with bwa mem and produces a coordinate sorted, indexed BAM")
        .with_container("michaelfranklin/align_sortedbam:1.0.0")
        .with_input(ToolInput::new("reference", DataType::FastaWithDict).prefix("--reference"))
        .with_input(
            ToolInput::new("read_group_header_line", DataType::String)
                .prefix("--read-group")
                .doc("Read group header, e.g. '@RG\\tID:foo\\tSM:bar'"),
        )
        .with_input(ToolInput::new("fastq", DataType::array(DataType::Fastq)).position(10))
        .with_input(ToolInput::new("tmpdir", DataType::Directory).prefix("--tmp-dir"))
        .with_input(
            ToolInput::new("threads", DataType::Int)
                .prefix("--threads")
                .default_value(4),
        )
        .with_output(ToolOutput::new("o3_sortsam", DataType::IndexedBam).glob("sorted.bam"))
}

fn merge_sam_files() -> ToolDefinition {
    gatk("Gatk4MergeSamFiles", "MergeSamFiles")
        .with_doc("Merges multiple SAM/BAM files into one file")
        .with_input(
            ToolInput::new("input", DataType::array(DataType::Bam))
                .prefix("-I")
                .accumulating(),
        )
        .with_input(tmp_dir())
        .with_input(
            ToolInput::new("outputFilename", DataType::String)
                .prefix("-O")
                .default_value("merged.bam"),
        )
        .with_input(
            ToolInput::new("createIndex", DataType::Boolean)
                .prefix("--CREATE_INDEX")
                .optional(),
        )
        .with_input(
            ToolInput::new("useThreading", DataType::Boolean)
                .prefix("--USE_THREADING")
                .optional(),
        )
        .with_input(
            ToolInput::new("maxRecordsInRam", DataType::Int)
                .prefix("--MAX_RECORDS_IN_RAM")
                .optional(),
        )
        .with_input(
            ToolInput::new("validationStringency", DataType::String)
                .prefix("--VALIDATION_STRINGENCY")
                .optional(),
        )
        .with_output(ToolOutput::new("output", DataType::IndexedBam).glob("merged.bam"))
}

fn mark_duplicates() -> ToolDefinition {
    gatk("Gatk4MarkDuplicates", "MarkDuplicates")
        .with_doc("Identifies duplicate reads")
        .with_input(ToolInput::new("input", DataType::Bam).prefix("-I"))
        .with_input(tmp_dir())
        .with_input(
            ToolInput::new("outputFilename", DataType::String)
                .prefix("-O")
                .default_value("markduped.bam"),
        )
        .with_input(
            ToolInput::new("metricsFilename", DataType::String)
                .prefix("-M")
                .default_value("metrics.txt"),
        )
        .with_input(
            ToolInput::new("createIndex", DataType::Boolean)
                .prefix("--CREATE_INDEX")
                .optional(),
        )
        .with_input(
            ToolInput::new("maxRecordsInRam", DataType::Int)
                .prefix("--MAX_RECORDS_IN_RAM")
                .optional(),
        )
        .with_output(ToolOutput::new("output", DataType::IndexedBam).glob("markduped.bam"))
        .with_output(ToolOutput::new("metrics", DataType::TextFile).glob("metrics.txt"))
}

fn base_recalibrator() -> ToolDefinition {
    gatk("Gatk4BaseRecalibrator", "BaseRecalibrator")
        .with_doc("Generates a recalibration table for Base Quality Score Recalibration")
        .with_input(ToolInput::new("input", DataType::Bam).prefix("-I"))
        .with_input(
            ToolInput::new("knownSites", DataType::array(DataType::Vcf))
                .prefix("--known-sites")
                .accumulating(),
        )
        .with_input(ToolInput::new("reference", DataType::FastaWithDict).prefix("-R"))
        .with_input(tmp_dir())
        .with_input(
            ToolInput::new("outputFilename", DataType::String)
                .prefix("-O")
                .default_value("recal.table"),
        )
        .with_output(ToolOutput::new("output", DataType::Tsv).glob("recal.table"))
}

fn apply_bqsr() -> ToolDefinition {
    gatk("Gatk4ApplyBqsr", "ApplyBQSR")
        .with_doc("Recalibrates base qualities of the input reads")
        .with_input(ToolInput::new("input", DataType::IndexedBam).prefix("-I"))
        .with_input(ToolInput::new("reference", DataType::FastaWithDict).prefix("-R"))
        .with_input(ToolInput::new("recalFile", DataType::Tsv).prefix("--bqsr-recal-file"))
        .with_input(tmp_dir())
        .with_input(
            ToolInput::new("outputFilename", DataType::String)
                .prefix("-O")
                .default_value("recalibrated.bam"),
        )
        .with_output(ToolOutput::new("output", DataType::IndexedBam).glob("recalibrated.bam"))
}

fn mutect2() -> ToolDefinition {
    gatk("GatkMutect2", "Mutect2")
        .with_doc("Calls somatic SNVs and indels from a tumor/normal pair")
        .with_input(ToolInput::new("tumor", DataType::IndexedBam).prefix("-I"))
        .with_input(ToolInput::new("tumorName", DataType::String).prefix("-tumor"))
        .with_input(ToolInput::new("normal", DataType::IndexedBam).prefix("-I"))
        .with_input(ToolInput::new("normalName", DataType::String).prefix("-normal"))
        .with_input(ToolInput::new("reference", DataType::FastaWithDict).prefix("-R"))
        .with_input(
            ToolInput::new("germlineResource", DataType::VcfIdx)
                .prefix("--germline-resource")
                .optional(),
        )
        .with_input(
            ToolInput::new("outputFilename", DataType::String)
                .prefix("-O")
                .default_value("somatic.vcf.gz"),
        )
        .with_output(ToolOutput::new("output", DataType::VcfTabix).glob("somatic.vcf.gz"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::port::HasPortSchema;

    #[test]
    fn test_builtin_tools_validate() {
        for tool in builtin_tools() {
            assert!(tool.validate().is_ok(), "invalid built-in tool {}", tool.id);
        }
    }

    #[test]
    fn test_builtin_catalog_contents() {
        let catalog = ToolCatalog::builtin();
        assert_eq!(catalog.len(), 6);

        let ids: Vec<&str> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids[0], "AlignSortedBam");
        assert!(ids.contains(&"GatkMutect2"));
    }

    #[test]
    fn test_mark_duplicates_has_two_outputs() {
        let tool = ToolCatalog::builtin().get("Gatk4MarkDuplicates").unwrap();
        let outputs: Vec<String> = tool.output_ports().into_iter().map(|p| p.name).collect();
        assert_eq!(outputs, vec!["output", "metrics"]);
    }

    #[test]
    fn test_known_sites_accumulates() {
        let tool = ToolCatalog::builtin().get("Gatk4BaseRecalibrator").unwrap();
        assert!(tool.input("knownSites").unwrap().accumulate);
    }
}
