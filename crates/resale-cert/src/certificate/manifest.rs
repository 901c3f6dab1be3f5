//! Ground-truth list of fields present in a template revision.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::document::FormDocument;

const STANDARD_MANIFEST: &str = include_str!("../../assets/resale_certificate_fields.json");

/// Checkboxes the mapper emits that are not listed in the base manifest. They are derived at
/// runtime from insurance rows whose article/section reference is filled in.
pub const RUNTIME_CHECKBOXES: &[&str] = &[
    "See Article SectionRow1",
    "See Article SectionRow2",
    "See Article SectionRow3",
    "See Article SectionRow4",
];

/// Closed set of field behaviors the filler knows how to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Checkbox,
    Choice,
    Dropdown,
}

impl FieldKind {
    /// Kind implied by the naming convention alone: `Group.ChoiceN` names are choice options,
    /// everything else is assumed to be text.
    pub fn infer(name: &str) -> Self {
        if split_choice_name(name).is_some() {
            Self::Choice
        } else {
            Self::Text
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Choice => "choice",
            FieldKind::Dropdown => "dropdown",
        }
    }

    /// Boolean kinds must always be emitted so the filler can clear them explicitly.
    pub fn is_boolean(self) -> bool {
        matches!(self, FieldKind::Checkbox | FieldKind::Choice)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Split `"Group3.Choice1"` into `("Group3", "Choice1")`.
pub fn split_choice_name(name: &str) -> Option<(&str, &str)> {
    let (group, option) = name.rsplit_once('.')?;
    let index = option.strip_prefix("Choice")?;
    if group.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((group, option))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
}

impl ManifestEntry {
    pub fn kind(&self) -> FieldKind {
        self.kind.unwrap_or_else(|| FieldKind::infer(&self.name))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    template: Option<String>,
    fields: Vec<ManifestEntry>,
}

/// Ordered field names and kinds for one template version.
#[derive(Debug, Clone)]
pub struct FieldManifest {
    version: Option<String>,
    entries: Vec<ManifestEntry>,
    index: HashMap<String, usize>,
}

impl FieldManifest {
    pub fn new(
        version: Option<String>,
        entries: Vec<ManifestEntry>,
    ) -> Result<Self, ManifestError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ManifestError::BlankName { position });
            }
            if index.insert(entry.name.clone(), position).is_some() {
                return Err(ManifestError::DuplicateField(entry.name.clone()));
            }
        }

        Ok(Self {
            version,
            entries,
            index,
        })
    }

    /// Manifest bundled with the crate for the current resale certificate template.
    pub fn standard() -> Result<Self, ManifestError> {
        Self::from_json(STANDARD_MANIFEST)
    }

    pub fn from_json(raw: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_json::from_str(raw)?;
        Self::new(file.template, file.fields)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Derive a manifest from the field registry of an opened template.
    ///
    /// Radio groups are expanded into one `Group.Option` entry per option.
    pub fn from_form<F: FormDocument + ?Sized>(
        form: &F,
        version: Option<String>,
    ) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for field in form.fields() {
            if field.kind != FieldKind::Choice {
                entries.push(ManifestEntry {
                    name: field.name,
                    kind: Some(field.kind),
                });
                continue;
            }

            let options = form.options(&field.name).unwrap_or_default();
            entries.extend(options.into_iter().map(|option| ManifestEntry {
                name: format!("{}.{}", field.name, option),
                kind: Some(FieldKind::Choice),
            }));
        }
        Self::new(version, entries)
    }

    /// Union in runtime-only checkboxes that the base manifest does not list.
    pub fn with_runtime_checkboxes(mut self, names: &[&str]) -> Self {
        for name in names {
            if self.index.contains_key(*name) {
                continue;
            }
            self.index.insert((*name).to_string(), self.entries.len());
            self.entries.push(ManifestEntry {
                name: (*name).to_string(),
                kind: Some(FieldKind::Checkbox),
            });
        }
        self
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.index
            .get(name)
            .map(|position| self.entries[*position].kind())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        let file = ManifestFile {
            template: self.version.clone(),
            fields: self.entries.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field '{0}' is listed more than once")]
    DuplicateField(String),
    #[error("field at position {position} has a blank name")]
    BlankName { position: usize },
}
