//! Data Types
//!
//! The typed vocabulary that ports are declared with, together with the
//! compatibility relation the edge resolver consults.
//!
//! File types form a small hierarchy: a port that expects a `Bam` also
//! accepts an `IndexedBam`, a port that expects a `File` accepts any file.
//!
//! Types have a textual form used in YAML catalogs and manifests:
//!
//! ```
//! use rustweaver::types::DataType;
//!
//! let known_sites: DataType = "Array<VcfIdx>".parse().unwrap();
//! assert_eq!(known_sites, DataType::array(DataType::VcfIdx));
//! assert_eq!(known_sites.to_string(), "Array<VcfIdx>");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;

/// Deepest `Array<...>` nesting accepted in the textual form.
pub const MAX_ARRAY_DEPTH: usize = 8;

/// A port's data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    String,
    Int,
    Float,
    Boolean,
    File,
    Directory,
    Fastq,
    Fasta,
    FastaWithDict,
    Sam,
    Bam,
    IndexedBam,
    Vcf,
    VcfIdx,
    VcfTabix,
    Tsv,
    TextFile,
    Array(Box<DataType>),
}

impl DataType {
    /// Shorthand for `Array<item>`.
    pub fn array(item: DataType) -> Self {
        DataType::Array(Box::new(item))
    }

    /// Element type for arrays, `None` for scalars.
    pub fn item(&self) -> Option<&DataType> {
        match self {
            DataType::Array(item) => Some(item),
            _ => None,
        }
    }

    /// Direct supertype in the file hierarchy.
    pub fn parent(&self) -> Option<DataType> {
        use DataType::*;

        match self {
            FastaWithDict => Some(Fasta),
            IndexedBam => Some(Bam),
            VcfIdx | VcfTabix => Some(Vcf),
            Fastq | Fasta | Sam | Bam | Vcf | Tsv | TextFile => Some(File),
            _ => None,
        }
    }

    /// Returns true for `File` and everything below it.
    pub fn is_file(&self) -> bool {
        *self == DataType::File || self.parent().is_some()
    }

    /// Whether a port of this type can receive a value of type `source`.
    pub fn accepts(&self, source: &DataType) -> bool {
        if self == source {
            return true;
        }

        match (self, source) {
            (DataType::Array(dest), DataType::Array(src)) => dest.accepts(src),
            (DataType::Array(_), _) | (_, DataType::Array(_)) => false,
            _ => {
                let mut current = source.parent();
                while let Some(ancestor) = current {
                    if ancestor == *self {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
        }
    }

    /// Whether an array-accumulating port of this type can receive `source`
    /// as one more element.
    pub fn accepts_element(&self, source: &DataType) -> bool {
        self.accepts(source) || self.item().is_some_and(|item| item.accepts(source))
    }

    /// Checks a literal default value against this type.
    ///
    /// File-like types take a path string.
    pub fn accepts_value(&self, value: &Value) -> bool {
        match (self, value) {
            (DataType::String, Value::String(_)) => true,
            (DataType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (DataType::Float, Value::Number(_)) => true,
            (DataType::Boolean, Value::Bool(_)) => true,
            (DataType::Directory, Value::String(_)) => true,
            (DataType::Array(item), Value::Array(values)) => {
                values.iter().all(|v| item.accepts_value(v))
            }
            (ty, Value::String(_)) => ty.is_file(),
            _ => false,
        }
    }

    /// Index/companion files that travel with the primary file.
    ///
    /// Uses the CWL pattern syntax, `^` strips one extension.
    pub fn secondary_files(&self) -> &'static [&'static str] {
        match self {
            DataType::FastaWithDict => &[".fai", "^.dict"],
            DataType::IndexedBam => &[".bai"],
            DataType::VcfIdx => &[".idx"],
            DataType::VcfTabix => &[".tbi"],
            DataType::Array(item) => item.secondary_files(),
            _ => &[],
        }
    }

    fn name(&self) -> &'static str {
        use DataType::*;

        match self {
            String => "String",
            Int => "Int",
            Float => "Float",
            Boolean => "Boolean",
            File => "File",
            Directory => "Directory",
            Fastq => "Fastq",
            Fasta => "Fasta",
            FastaWithDict => "FastaWithDict",
            Sam => "Sam",
            Bam => "Bam",
            IndexedBam => "IndexedBam",
            Vcf => "Vcf",
            VcfIdx => "VcfIdx",
            VcfTabix => "VcfTabix",
            Tsv => "Tsv",
            TextFile => "TextFile",
            Array(_) => "Array",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Array(item) => write!(f, "Array<{}>", item),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for DataType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use DataType::*;

        let mut s = s.trim();
        let mut depth = 0;
        while let Some(inner) = s.strip_prefix("Array<").and_then(|r| r.strip_suffix('>')) {
            depth += 1;
            if depth > MAX_ARRAY_DEPTH {
                return Err(GraphError::InvalidType(format!(
                    "arrays nested deeper than {} levels",
                    MAX_ARRAY_DEPTH
                )));
            }
            s = inner.trim();
        }

        let ty = match s {
            "String" => String,
            "Int" => Int,
            "Float" => Float,
            "Boolean" => Boolean,
            "File" => File,
            "Directory" => Directory,
            "Fastq" => Fastq,
            "Fasta" => Fasta,
            "FastaWithDict" => FastaWithDict,
            "Sam" => Sam,
            "Bam" => Bam,
            "IndexedBam" | "BamBai" => IndexedBam,
            "Vcf" => Vcf,
            "VcfIdx" => VcfIdx,
            "VcfTabix" => VcfTabix,
            "Tsv" => Tsv,
            "TextFile" => TextFile,
            other => return Err(GraphError::InvalidType(other.to_string())),
        };
        Ok((0..depth).fold(ty, |item, _| DataType::array(item)))
    }
}

impl TryFrom<String> for DataType {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(ty: DataType) -> Self {
        ty.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scalar_and_nested_array() {
        assert_eq!("VcfTabix".parse::<DataType>().unwrap(), DataType::VcfTabix);
        assert_eq!(
            "Array<Array<Fastq>>".parse::<DataType>().unwrap(),
            DataType::array(DataType::array(DataType::Fastq))
        );
        assert_eq!("BamBai".parse::<DataType>().unwrap(), DataType::IndexedBam);
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let nested = |depth: usize| format!("{}Bam{}", "Array<".repeat(depth), ">".repeat(depth));

        let at_limit = nested(MAX_ARRAY_DEPTH).parse::<DataType>().unwrap();
        assert_eq!(at_limit.to_string(), nested(MAX_ARRAY_DEPTH));

        assert!(matches!(
            nested(MAX_ARRAY_DEPTH + 1).parse::<DataType>(),
            Err(GraphError::InvalidType(_))
        ));
        assert!(matches!(
            nested(100_000).parse::<DataType>(),
            Err(GraphError::InvalidType(_))
        ));
    }

    #[test]
    fn test_parse_unknown_type() {
        let result = "Cram".parse::<DataType>();
        assert!(matches!(result, Err(GraphError::InvalidType(name)) if name == "Cram"));
    }

    #[test]
    fn test_subtype_is_accepted() {
        assert!(DataType::Bam.accepts(&DataType::IndexedBam));
        assert!(DataType::File.accepts(&DataType::VcfTabix));
        assert!(DataType::Fasta.accepts(&DataType::FastaWithDict));
        assert!(!DataType::IndexedBam.accepts(&DataType::Bam));
        assert!(!DataType::VcfIdx.accepts(&DataType::VcfTabix));
        assert!(!DataType::String.accepts(&DataType::File));
    }

    #[test]
    fn test_array_compatibility() {
        let vcfs = DataType::array(DataType::Vcf);
        assert!(vcfs.accepts(&DataType::array(DataType::VcfIdx)));
        assert!(!vcfs.accepts(&DataType::VcfIdx));
        assert!(vcfs.accepts_element(&DataType::VcfIdx));
        assert!(vcfs.accepts_element(&DataType::VcfTabix));
        assert!(!vcfs.accepts_element(&DataType::Bam));
        assert!(!DataType::Vcf.accepts(&vcfs));
    }

    #[test]
    fn test_accepts_value() {
        assert!(DataType::Boolean.accepts_value(&json!(true)));
        assert!(DataType::Int.accepts_value(&json!(5000000)));
        assert!(!DataType::Int.accepts_value(&json!(1.5)));
        assert!(DataType::Float.accepts_value(&json!(3)));
        assert!(DataType::String.accepts_value(&json!("SILENT")));
        assert!(DataType::Bam.accepts_value(&json!("/data/sample.bam")));
        assert!(!DataType::Boolean.accepts_value(&json!("true")));
        assert!(DataType::array(DataType::Int).accepts_value(&json!([1, 2])));
    }

    #[test]
    fn test_secondary_files() {
        assert_eq!(DataType::FastaWithDict.secondary_files(), &[".fai", "^.dict"]);
        assert_eq!(DataType::array(DataType::VcfIdx).secondary_files(), &[".idx"]);
        assert!(DataType::Bam.secondary_files().is_empty());
    }

    #[test]
    fn test_serde_uses_textual_form() {
        let yaml = serde_yaml::to_string(&DataType::array(DataType::VcfIdx)).unwrap();
        assert!(yaml.contains("Array<VcfIdx>"));

        let parsed: DataType = serde_yaml::from_str("IndexedBam").unwrap();
        assert_eq!(parsed, DataType::IndexedBam);
    }
}
