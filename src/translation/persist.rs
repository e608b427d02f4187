use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use super::{Document, Translation};
use crate::error::{GraphError, Result};

fn persistence_error(path: &Path) -> impl FnOnce(std::io::Error) -> GraphError + '_ {
    move |source| GraphError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes one document through a temporary file in its target directory,
/// so a reader never sees a partially written file.
fn write_document(dir: &Path, document: &Document) -> Result<PathBuf> {
    let path = dir.join(&document.path);
    let parent = path.parent().unwrap_or(dir);

    fs::create_dir_all(parent).map_err(persistence_error(parent))?;

    let mut file = NamedTempFile::new_in(parent).map_err(persistence_error(&path))?;
    file.write_all(document.content.as_bytes())
        .map_err(persistence_error(&path))?;
    file.persist(&path)
        .map_err(|e| persistence_error(&path)(e.error))?;

    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Writes every document of a translation under `dir`.
///
/// Documents are written one at a time. A failure stops at the failing
/// document and leaves the documents already written in place.
pub fn persist(translation: &Translation, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::with_capacity(translation.document_count());

    for document in translation.documents() {
        written.push(write_document(dir, document)?);
    }

    info!("Saved {} documents to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::TranslationFormat;
    use tempfile::tempdir;

    fn document(path: &str, content: &str) -> Document {
        Document {
            name: path.to_string(),
            path: PathBuf::from(path),
            content: content.to_string(),
        }
    }

    fn translation() -> Translation {
        Translation {
            format: TranslationFormat::Cwl,
            main: document("main.cwl", "class: Workflow\n"),
            subworkflows: vec![document("subworkflows/inner.cwl", "class: Workflow\n")],
            tools: vec![document("tools/Sort.cwl", "class: CommandLineTool\n")],
        }
    }

    #[test]
    fn test_persist_writes_all_documents() {
        let temp_dir = tempdir().unwrap();
        let written = persist(&translation(), temp_dir.path()).unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("tools/Sort.cwl")).unwrap(),
            "class: CommandLineTool\n"
        );
    }

    #[test]
    fn test_persist_overwrites() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("main.cwl"), "stale").unwrap();

        persist(&translation(), temp_dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("main.cwl")).unwrap(),
            "class: Workflow\n"
        );
    }

    #[test]
    fn test_failure_keeps_written_siblings() {
        let temp_dir = tempdir().unwrap();
        // A file where the tools directory should go.
        fs::write(temp_dir.path().join("tools"), "not a directory").unwrap();

        let result = persist(&translation(), temp_dir.path());
        match result {
            Err(GraphError::Persistence { path, .. }) => {
                assert!(path.starts_with(temp_dir.path().join("tools")));
            }
            other => panic!("expected persistence error, got {:?}", other),
        }

        assert!(temp_dir.path().join("main.cwl").exists());
        assert!(temp_dir.path().join("subworkflows/inner.cwl").exists());
    }
}
