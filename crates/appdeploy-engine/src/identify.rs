//! Manifest identification
//!
//! Rendered documents are only parsed far enough to learn what they are:
//! `kind` and `metadata.name`. The rest of the document is never interpreted.

use appdeploy_core::Manifest;
use serde::Deserialize;

use crate::error::{EngineError, Result};

#[derive(Debug, Default, Deserialize)]
struct TypeData {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: Option<String>,
}

/// Extract the identity of a rendered manifest
///
/// Empty documents (a trailing `---`, comment-only sections) are ignored;
/// more than one non-empty document is rejected. `source_name` is only used
/// for error messages.
pub fn identify(source_name: &str, rendered: &[u8]) -> Result<Manifest> {
    let invalid = |e: serde_yaml::Error| EngineError::invalid_manifest(source_name, e.to_string());

    let mut document = None;
    for part in serde_yaml::Deserializer::from_slice(rendered) {
        let value = serde_yaml::Value::deserialize(part).map_err(invalid)?;
        if value.is_null() {
            continue;
        }
        if document.is_some() {
            return Err(EngineError::invalid_manifest(
                source_name,
                "more than one document",
            ));
        }
        document = Some(value);
    }

    let data: TypeData = match document {
        Some(value) => serde_yaml::from_value(value).map_err(invalid)?,
        None => TypeData::default(),
    };

    let kind = data.kind.filter(|k| !k.trim().is_empty());
    let name = data
        .metadata
        .and_then(|m| m.name)
        .filter(|n| !n.trim().is_empty());

    match (kind, name) {
        (Some(kind), Some(name)) => Ok(Manifest::new(kind, name)),
        (None, _) => Err(EngineError::invalid_manifest(
            source_name,
            "missing type data (kind)",
        )),
        (_, None) => Err(EngineError::invalid_manifest(
            source_name,
            "missing metadata.name",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_service() {
        let doc = b"apiVersion: v1\nkind: Service\nmetadata:\n  name: test\n  labels:\n    app: web\nspec:\n  ports: []\n";
        let m = identify("svc.yaml", doc).unwrap();
        assert_eq!(m.kind, "Service");
        assert_eq!(m.name, "test");
        assert_eq!(m.filename(), "service--test.yaml");
    }

    #[test]
    fn test_identify_missing_kind() {
        let err = identify("x.yaml", b"metadata:\n  name: test\n").unwrap_err();
        assert!(matches!(err, EngineError::InvalidManifest { ref name, .. } if name == "x.yaml"));
    }

    #[test]
    fn test_identify_missing_name() {
        assert!(identify("x.yaml", b"kind: Service\n").is_err());
        assert!(identify("x.yaml", b"kind: Service\nmetadata:\n  labels: {}\n").is_err());
        assert!(identify("x.yaml", b"kind: Service\nmetadata:\n  name: ''\n").is_err());
    }

    #[test]
    fn test_identify_not_yaml_mapping() {
        assert!(identify("x.yaml", b"just some text").is_err());
        assert!(identify("x.yaml", b"kind: [unclosed").is_err());
    }

    #[test]
    fn test_identify_trailing_separator() {
        let m = identify("t.yaml", b"kind: Service\nmetadata:\n  name: a\n---").unwrap();
        assert_eq!(m, Manifest::new("Service", "a"));

        let m = identify("t.yaml", b"kind: Service\nmetadata:\n  name: a\n---\n# comment\n").unwrap();
        assert_eq!(m, Manifest::new("Service", "a"));

        let m = identify("t.yaml", b"---\nkind: Service\nmetadata:\n  name: a\n").unwrap();
        assert_eq!(m, Manifest::new("Service", "a"));
    }

    #[test]
    fn test_identify_rejects_multiple_documents() {
        let doc = b"kind: Service\nmetadata:\n  name: a\n---\nkind: Service\nmetadata:\n  name: b\n";
        assert!(identify("multi.yaml", doc).is_err());
    }
}
