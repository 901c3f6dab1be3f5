//! Field-registry view of a fillable template.

mod pdf;

pub use pdf::PdfForm;

use std::collections::BTreeMap;

use serde::Serialize;

use super::manifest::FieldKind;

/// A named field as the template itself classifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
}

/// Current state of a field, read back from the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FormValue {
    Text(String),
    Checkbox(bool),
    Choice(Option<String>),
    Dropdown(Option<String>),
}

/// Mutation surface the filler needs from a template document.
///
/// Implementations must dispatch on their own field metadata; a call for a field of a
/// different kind returns [`FieldFault::KindMismatch`] rather than guessing.
pub trait FormDocument {
    fn fields(&self) -> Vec<FormField>;
    fn values(&self) -> BTreeMap<String, FormValue>;
    fn set_text(&mut self, name: &str, text: &str, font_size: f32) -> Result<(), FieldFault>;
    fn set_checked(&mut self, name: &str, checked: bool) -> Result<(), FieldFault>;
    /// Selectable options of a choice group or dropdown.
    fn options(&self, name: &str) -> Result<Vec<String>, FieldFault>;
    fn select_choice(&mut self, name: &str, option: &str) -> Result<(), FieldFault>;
    fn clear_choice(&mut self, name: &str) -> Result<(), FieldFault>;
    fn select_dropdown(&mut self, name: &str, option: &str) -> Result<(), FieldFault>;
}

/// Recoverable failure writing one field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldFault {
    #[error("field '{0}' does not exist in the template")]
    Unknown(String),
    #[error("field '{field}' is a {actual} field, not {expected}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        actual: FieldKind,
    },
    #[error("widget of '{0}' has no usable /Rect")]
    MissingRect(String),
    #[error("'{option}' is not an option of '{field}'")]
    OptionNotFound { field: String, option: String },
    #[error("malformed form object for '{field}': {detail}")]
    Malformed { field: String, detail: String },
}
