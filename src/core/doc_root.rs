use crate::domain::location::RepoLocation;
use crate::domain::model::Entity;
use crate::domain::ports::UrlReader;
use crate::utils::error::{PluginError, Result};
use std::path::PathBuf;

pub const TECHDOCS_REF_ANNOTATION: &str = "backstage.io/techdocs-ref";

/// A parsed `<type>:<target>` reference annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    pub kind: String,
    pub target: String,
}

impl DocRef {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| PluginError::InvalidDocRef {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (kind, target) = value
            .split_once(':')
            .ok_or_else(|| invalid("expected <type>:<target>"))?;
        let (kind, target) = (kind.trim(), target.trim());

        if kind.is_empty() {
            return Err(invalid("reference type is empty"));
        }
        if target.is_empty() {
            return Err(invalid("reference target is empty"));
        }

        Ok(Self {
            kind: kind.to_string(),
            target: target.to_string(),
        })
    }

    pub fn from_entity(entity: &Entity) -> Result<Self> {
        let value = entity.annotation(TECHDOCS_REF_ANNOTATION).ok_or_else(|| {
            PluginError::MissingAnnotation {
                annotation: TECHDOCS_REF_ANNOTATION.to_string(),
            }
        })?;
        Self::parse(value)
    }

    /// Directory of the referenced config file below the repository root; empty at the root.
    pub fn sub_path(&self) -> Result<String> {
        Ok(RepoLocation::parse(&self.target)?.directory())
    }
}

/// Materializes the entity's repository and returns the directory holding its docs.
///
/// The result is `<dir>/<sub path>`, or `<dir>/.` when the reference points at the root.
pub async fn resolve_doc_root(reader: &dyn UrlReader, entity: &Entity) -> Result<PathBuf> {
    let doc_ref = DocRef::from_entity(entity)?;
    let sub_path = doc_ref.sub_path()?;

    tracing::debug!(
        "Resolving docs for {} from {} reference {}",
        entity.metadata.name,
        doc_ref.kind,
        doc_ref.target
    );

    let tree = reader.read_tree(&doc_ref.target).await?;
    let dir = tree.dir().await?;

    let sub_path = if sub_path.is_empty() {
        ".".to_string()
    } else {
        sub_path
    };
    Ok(dir.join(sub_path))
}
