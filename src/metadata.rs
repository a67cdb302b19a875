//! Sidecar metadata and the standard footnote dictionary.
//!
//! Every artifact `name.ext` may carry a JSON sidecar
//! `name_ext_metadata.json` in the same directory, written by the
//! upstream generator. The footnote dictionary is a YAML file mapping
//! metadata types and abbreviation tokens to canonical text.

use crate::error::Result;
use crate::marker::ArtifactKind;
use crate::utils::split_artifact_name;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceMeta {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub latest_time: Option<String>,
}

impl SourceMeta {
    /// The timestamp to render, preferring the most recent one.
    pub fn timestamp(&self) -> Option<&String> {
        self.latest_time.as_ref().or(self.creation_time.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FootnoteMeta {
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub abbreviations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
    /// Discriminator into the footnote dictionary; the sentinel `"NA"`
    /// means no canonical note applies.
    #[serde(default)]
    pub meta_type: Option<String>,
    #[serde(default)]
    pub footnotes: FootnoteMeta,
}

/// One artifact's sidecar record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub source_meta: SourceMeta,
    #[serde(default)]
    pub object_meta: ObjectMeta,
}

/// Sidecar file name for an artifact: `name.ext` -> `name_ext_metadata.json`.
pub fn metadata_file_name(artifact_file: &str) -> String {
    let (stem, extension) = split_artifact_name(artifact_file);
    format!("{}_{}_metadata.json", stem, extension)
}

/// Loads the sidecar for `artifact_file` from `artifact_dir`.
///
/// A missing sidecar is an expected condition and returns `Ok(None)`
/// with a warning; an unreadable or malformed sidecar is an error.
pub fn load_metadata(artifact_dir: &Path, artifact_file: &str) -> Result<Option<MetadataRecord>> {
    let path = artifact_dir.join(metadata_file_name(artifact_file));

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("Metadata file not found: {}", path.display());
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Some(serde_json::from_str(&raw)?))
}

/// The standard footnote dictionary: canonical notes per metadata type
/// (split by artifact kind) plus abbreviation expansions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FootnoteDictionary {
    #[serde(default)]
    pub figure_footnotes: BTreeMap<String, String>,
    #[serde(default)]
    pub table_footnotes: BTreeMap<String, String>,
    #[serde(default)]
    pub abbreviations: BTreeMap<String, String>,
}

impl FootnoteDictionary {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn canonical_note(&self, kind: ArtifactKind, meta_type: &str) -> Option<&String> {
        match kind {
            ArtifactKind::Figure => self.figure_footnotes.get(meta_type),
            ArtifactKind::Table => self.table_footnotes.get(meta_type),
        }
    }

    pub fn expansion(&self, token: &str) -> Option<&String> {
        self.abbreviations.get(token)
    }
}
