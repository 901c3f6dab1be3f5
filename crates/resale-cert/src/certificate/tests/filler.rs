use super::common::*;

use crate::certificate::descriptor::FieldDescriptor;
use crate::certificate::document::{FieldFault, FormDocument, FormValue};
use crate::certificate::filler::{DocumentFiller, FillError};

fn yes_no_form() -> MemoryForm {
    MemoryForm::default()
        .with_text("Association Name")
        .with_checkbox("Budget Attached", true)
        .with_radio("Group3", &["Choice1", "Choice2"], None)
        .with_dropdown("Delivery Method", DELIVERY_OPTIONS)
}

#[test]
fn writes_each_kind_using_the_template_classification() {
    let mut form = yes_no_form();
    let descriptors = vec![
        FieldDescriptor::text("Association Name", "Maple Ridge"),
        FieldDescriptor::checkbox("Budget Attached", false),
        FieldDescriptor::choice("Group3.Choice1", true),
        FieldDescriptor::choice("Group3.Choice2", false),
        FieldDescriptor::text("Delivery Method", "Mail"),
    ];

    let report = DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert_eq!(
        form.value("Association Name"),
        Some(&FormValue::Text("Maple Ridge".to_string()))
    );
    assert_eq!(form.value("Budget Attached"), Some(&FormValue::Checkbox(false)));
    assert_eq!(
        form.value("Group3"),
        Some(&FormValue::Choice(Some("Choice1".to_string())))
    );
    assert_eq!(
        form.value("Delivery Method"),
        Some(&FormValue::Dropdown(Some("Mail".to_string())))
    );
    assert!(report.faults.is_empty());
    assert!(report.skipped.is_empty());
    assert!(report.radio_conflicts.is_empty());
}

#[test]
fn checkbox_state_reads_either_channel() {
    let mut form = MemoryForm::default()
        .with_checkbox("Bylaws Attached", false)
        .with_checkbox("Declaration Attached", false);
    let descriptors = vec![
        FieldDescriptor::text("Bylaws Attached", "True"),
        FieldDescriptor {
            field_name: "Declaration Attached".to_string(),
            text: Some("1".to_string()),
            value: None,
        },
    ];

    DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert_eq!(form.value("Bylaws Attached"), Some(&FormValue::Checkbox(true)));
    assert_eq!(form.value("Declaration Attached"), Some(&FormValue::Checkbox(true)));
}

#[test]
fn text_value_falls_back_to_the_boolean_channel() {
    let mut form = MemoryForm::default().with_text("Lot Number");
    DocumentFiller::default().fill_form(&mut form, &[FieldDescriptor::checkbox("Lot Number", true)]);

    assert_eq!(
        form.value("Lot Number"),
        Some(&FormValue::Text("true".to_string()))
    );
}

#[test]
fn unknown_fields_are_skipped_without_failing() {
    let mut form = yes_no_form();
    let descriptors = vec![
        FieldDescriptor::text("Retired Field", "ignored"),
        FieldDescriptor::text("Association Name", "Maple Ridge"),
        FieldDescriptor::choice("Group99.Choice1", true),
    ];

    let report = DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert_eq!(report.skipped, vec!["Retired Field", "Group99.Choice1"]);
    assert_eq!(report.written, 1);
    assert_eq!(
        form.value("Association Name"),
        Some(&FormValue::Text("Maple Ridge".to_string()))
    );
}

#[test]
fn field_faults_do_not_abort_the_fill() {
    let mut form = yes_no_form()
        .with_text("Lot Number")
        .broken_text("Association Name");
    let descriptors = vec![
        FieldDescriptor::text("Association Name", "Maple Ridge"),
        FieldDescriptor::text("Delivery Method", "Carrier pigeon"),
        FieldDescriptor::text("Lot Number", "42"),
    ];

    let report = DocumentFiller::default().fill_form(&mut form, &descriptors);

    let faulted: Vec<&str> = report.faults.iter().map(|failure| failure.field.as_str()).collect();
    assert_eq!(faulted, vec!["Association Name", "Delivery Method"]);
    assert!(matches!(
        report.faults[1].fault,
        FieldFault::OptionNotFound { .. }
    ));
    assert_eq!(form.value("Lot Number"), Some(&FormValue::Text("42".to_string())));
    assert_eq!(form.value("Delivery Method"), Some(&FormValue::Dropdown(None)));
}

#[test]
fn blank_dropdown_values_leave_the_field_alone() {
    let mut form = yes_no_form();
    let report =
        DocumentFiller::default().fill_form(&mut form, &[FieldDescriptor::text("Delivery Method", "")]);

    assert!(report.faults.is_empty());
    assert_eq!(report.written, 0);
    assert_eq!(form.value("Delivery Method"), Some(&FormValue::Dropdown(None)));
}

#[test]
fn legacy_group_names_resolve_to_the_template_group() {
    let mut form = yes_no_form();
    let descriptors = vec![
        FieldDescriptor::choice("Group_App3.Choice1", false),
        FieldDescriptor::choice("Group_App3.Choice2", true),
    ];

    let report = DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert!(report.skipped.is_empty());
    assert_eq!(
        form.value("Group3"),
        Some(&FormValue::Choice(Some("Choice2".to_string())))
    );
}

#[test]
fn unselected_groups_are_cleared() {
    let mut form =
        MemoryForm::default().with_radio("Group6", &["Choice1", "Choice2"], Some("Choice1"));
    let descriptors = vec![
        FieldDescriptor::choice("Group6.Choice1", false),
        FieldDescriptor::choice("Group6.Choice2", false),
    ];

    DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert_eq!(form.value("Group6"), Some(&FormValue::Choice(None)));
}

#[test]
fn conflicting_selections_keep_the_later_option_and_are_reported() {
    let mut form = yes_no_form();
    let descriptors = vec![
        FieldDescriptor::choice("Group3.Choice1", true),
        FieldDescriptor::choice("Group3.Choice2", true),
    ];

    let report = DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert_eq!(report.radio_conflicts, vec!["Group3"]);
    assert_eq!(
        form.value("Group3"),
        Some(&FormValue::Choice(Some("Choice2".to_string())))
    );
    assert!(form
        .selections
        .iter()
        .all(|(group, option)| group == "Group3" && option == "Choice2"));
}

#[test]
fn alias_duplicates_of_the_same_option_are_not_conflicts() {
    let mut form = yes_no_form();
    let descriptors = vec![
        FieldDescriptor::choice("Group3.Choice1", true),
        FieldDescriptor::choice("Group_App3.Choice1", true),
    ];

    let report = DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert!(report.radio_conflicts.is_empty());
}

#[test]
fn options_outside_the_group_are_rejected() {
    let mut form = MemoryForm::default().with_radio("Group4", &["Yes", "No"], None);
    let report = DocumentFiller::default()
        .fill_form(&mut form, &[FieldDescriptor::choice("Group4.Choice1", true)]);

    assert_eq!(form.value("Group4"), Some(&FormValue::Choice(None)));
    assert!(report.faults.iter().all(|failure| matches!(
        failure.fault,
        FieldFault::OptionNotFound { ref option, .. } if option == "Choice1"
    )));
    assert!(!report.faults.is_empty());
}

#[test]
fn exact_checkbox_names_win_over_group_fallback() {
    let mut form = MemoryForm::default()
        .with_checkbox("Group5.Choice1", false)
        .with_checkbox("Group5.Choice2", true);
    let descriptors = vec![
        FieldDescriptor::choice("Group5.Choice1", true),
        FieldDescriptor::choice("Group5.Choice2", false),
    ];

    DocumentFiller::default().fill_form(&mut form, &descriptors);

    assert_eq!(form.value("Group5.Choice1"), Some(&FormValue::Checkbox(true)));
    assert_eq!(form.value("Group5.Choice2"), Some(&FormValue::Checkbox(false)));
}

#[test]
fn filling_twice_yields_the_same_values() {
    let descriptors = mapper().map_at(&complete_application(), None, fixed_now());
    let filler = DocumentFiller::default();

    let mut form = yes_no_form().with_text("Lot Number");
    filler.fill_form(&mut form, &descriptors);
    let first = form.values();
    filler.fill_form(&mut form, &descriptors);

    assert_eq!(form.values(), first);
}

#[test]
fn corrupt_templates_are_fatal() {
    let result = DocumentFiller::default().fill(b"not a pdf", &[]);
    assert!(matches!(result, Err(FillError::Load(_))));
}
