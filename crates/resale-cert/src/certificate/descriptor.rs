use serde::{Deserialize, Serialize};

use super::data::is_truthy_str;
use super::manifest::FieldKind;

/// A single write request for one named template field.
///
/// `text` carries content for text and dropdown fields; `value` carries the checked state
/// for checkboxes and choice options. Choice options also carry `"1"`/`"0"` in `text` for
/// consumers that only read the text channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

impl FieldDescriptor {
    pub fn text(field_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            text: Some(text.into()),
            value: None,
        }
    }

    pub fn checkbox(field_name: impl Into<String>, checked: bool) -> Self {
        Self {
            field_name: field_name.into(),
            text: None,
            value: Some(checked),
        }
    }

    pub fn choice(field_name: impl Into<String>, selected: bool) -> Self {
        Self {
            field_name: field_name.into(),
            text: Some(if selected { "1" } else { "0" }.to_string()),
            value: Some(selected),
        }
    }

    /// Build the kind-appropriate descriptor for a mapped value.
    ///
    /// Flags aimed at text-like fields keep their state in `value` as well, so a field the
    /// manifest could not classify still fills correctly when the template holds a checkbox.
    pub fn for_kind(field_name: impl Into<String>, kind: FieldKind, value: FieldValue) -> Self {
        match kind {
            FieldKind::Text | FieldKind::Dropdown => {
                let flag = match value {
                    FieldValue::Flag(flag) => Some(flag),
                    FieldValue::Text(_) => None,
                };
                Self {
                    field_name: field_name.into(),
                    text: Some(value.into_text()),
                    value: flag,
                }
            }
            FieldKind::Checkbox => Self::checkbox(field_name, value.is_set()),
            FieldKind::Choice => Self::choice(field_name, value.is_set()),
        }
    }

    /// Checked state for checkbox and choice targets: `value == true`, or text `1`/`true`/`True`.
    pub fn is_selected(&self) -> bool {
        self.value == Some(true) || self.text.as_deref().map(is_checked_text).unwrap_or(false)
    }

    /// Content to write into a text-like field, preferring the text channel.
    pub fn content(&self) -> String {
        match (&self.text, self.value) {
            (Some(text), _) => text.clone(),
            (None, Some(value)) => value.to_string(),
            (None, None) => String::new(),
        }
    }
}

fn is_checked_text(text: &str) -> bool {
    matches!(text.trim(), "1" | "true" | "True")
}

/// Raw result of a mapping rule before it is shaped for the target field kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl FieldValue {
    pub fn empty_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text | FieldKind::Dropdown => Self::Text(String::new()),
            FieldKind::Checkbox | FieldKind::Choice => Self::Flag(false),
        }
    }

    pub fn is_set(&self) -> bool {
        match self {
            FieldValue::Text(text) => is_truthy_str(text),
            FieldValue::Flag(flag) => *flag,
        }
    }

    /// Text rendering; a set flag marks a text field with `X`.
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Flag(true) => "X".to_string(),
            FieldValue::Flag(false) => String::new(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_reads_either_channel() {
        assert!(FieldDescriptor::checkbox("A", true).is_selected());
        assert!(FieldDescriptor::text("A", "True").is_selected());
        assert!(FieldDescriptor::text("A", "1").is_selected());
        assert!(!FieldDescriptor::choice("Group1.Choice2", false).is_selected());
        assert!(!FieldDescriptor::text("A", "0").is_selected());
    }

    #[test]
    fn selection_ignores_loose_truthy_words() {
        for raw in ["yes", "Yes", "on", "TRUE ish", "2"] {
            assert!(
                !FieldDescriptor::text("Bylaws Attached", raw).is_selected(),
                "{raw:?} should leave the box unchecked"
            );
        }
        assert!(FieldDescriptor::text("Bylaws Attached", " true ").is_selected());
    }

    #[test]
    fn serializes_with_camel_case_and_skips_empty_channels() {
        let json = serde_json::to_value(FieldDescriptor::checkbox("Budget Attached", true))
            .expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({ "fieldName": "Budget Attached", "value": true })
        );
    }

    #[test]
    fn shapes_values_for_target_kind() {
        let choice = FieldDescriptor::for_kind("Group3.Choice1", FieldKind::Choice, true.into());
        assert_eq!(choice.text.as_deref(), Some("1"));
        assert_eq!(choice.value, Some(true));

        let text = FieldDescriptor::for_kind("Lot Number", FieldKind::Text, false.into());
        assert_eq!(text.text.as_deref(), Some(""));
        assert_eq!(text.content(), "");
        assert!(!text.is_selected());

        let plain = FieldDescriptor::for_kind("Lot Number", FieldKind::Text, "12".to_string().into());
        assert_eq!(plain.value, None);
    }

    #[test]
    fn flags_for_unclassified_fields_keep_their_checked_state() {
        let descriptor = FieldDescriptor::for_kind("Budget Attached", FieldKind::Text, true.into());
        assert_eq!(descriptor.text.as_deref(), Some("X"));
        assert_eq!(descriptor.value, Some(true));
        assert!(descriptor.is_selected());
    }
}
