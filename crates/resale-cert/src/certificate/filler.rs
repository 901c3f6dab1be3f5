use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::aliases;
use super::descriptor::FieldDescriptor;
use super::document::{FieldFault, FormDocument, PdfForm};
use super::manifest::{split_choice_name, FieldKind};

pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Fatal failures; there is no partial document to hand back.
#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error("could not load template: {0}")]
    Load(#[source] lopdf::Error),
    #[error("template has no interactive form")]
    MissingForm,
    #[error("could not save filled document: {0}")]
    Save(#[source] lopdf::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillOptions {
    pub font_size: f32,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// A field write that was recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub field: String,
    pub fault: FieldFault,
}

/// What a fill pass did. Only observable through logs and this value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub written: usize,
    pub skipped: Vec<String>,
    pub faults: Vec<FieldFailure>,
    /// Radio groups for which more than one option claimed selection.
    pub radio_conflicts: Vec<String>,
}

impl FillReport {
    fn fault(&mut self, field: &str, fault: FieldFault) {
        warn!(field, %fault, "field write failed, continuing");
        self.faults.push(FieldFailure {
            field: field.to_string(),
            fault,
        });
    }
}

#[derive(Debug)]
pub struct FilledDocument {
    pub bytes: Vec<u8>,
    pub report: FillReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Field { name: String, kind: FieldKind },
    GroupOption { group: String, option: String },
}

#[derive(Debug, Default)]
struct GroupSelection {
    selected: Option<String>,
}

/// Writes descriptors into a template's named fields, dispatching on the template's own
/// field kinds.
#[derive(Debug, Clone, Default)]
pub struct DocumentFiller {
    options: FillOptions,
}

impl DocumentFiller {
    pub fn new(options: FillOptions) -> Self {
        Self { options }
    }

    /// Load `template`, fill it, and serialize the result. Only load and save faults are
    /// returned as errors.
    pub fn fill(
        &self,
        template: &[u8],
        descriptors: &[FieldDescriptor],
    ) -> Result<FilledDocument, FillError> {
        let mut form = PdfForm::load(template)?;
        let report = self.fill_form(&mut form, descriptors);
        let bytes = form.to_bytes()?;

        debug!(
            written = report.written,
            skipped = report.skipped.len(),
            faults = report.faults.len(),
            "filled template"
        );
        Ok(FilledDocument { bytes, report })
    }

    /// Fill an already opened form in place.
    pub fn fill_form<F: FormDocument + ?Sized>(
        &self,
        form: &mut F,
        descriptors: &[FieldDescriptor],
    ) -> FillReport {
        let registry: HashMap<String, FieldKind> = form
            .fields()
            .into_iter()
            .map(|field| (field.name, field.kind))
            .collect();
        let mut report = FillReport::default();

        let targets: Vec<Option<Target>> = descriptors
            .iter()
            .map(|descriptor| resolve(&registry, &descriptor.field_name))
            .collect();
        let groups = prescan(descriptors, &targets, &mut report);

        for (descriptor, target) in descriptors.iter().zip(&targets) {
            let Some(target) = target else {
                debug!(field = %descriptor.field_name, "no matching template field, skipping");
                report.skipped.push(descriptor.field_name.clone());
                continue;
            };

            match self.write(form, descriptor, target, &groups) {
                Ok(true) => report.written += 1,
                Ok(false) => {}
                Err(fault) => report.fault(&descriptor.field_name, fault),
            }
        }

        for (group, selection) in &groups {
            if let Err(fault) = apply_group(form, group, selection.selected.as_deref()) {
                report.fault(group, fault);
            }
        }

        report
    }

    /// Returns whether a value was written.
    fn write<F: FormDocument + ?Sized>(
        &self,
        form: &mut F,
        descriptor: &FieldDescriptor,
        target: &Target,
        groups: &BTreeMap<String, GroupSelection>,
    ) -> Result<bool, FieldFault> {
        match target {
            Target::Field {
                name,
                kind: FieldKind::Text,
            } => {
                form.set_text(name, &descriptor.content(), self.options.font_size)?;
                Ok(true)
            }
            Target::Field {
                name,
                kind: FieldKind::Checkbox,
            } => {
                form.set_checked(name, descriptor.is_selected())?;
                Ok(true)
            }
            Target::Field {
                name,
                kind: FieldKind::Choice,
            } => {
                let option = descriptor.content();
                if option.is_empty() {
                    return Ok(false);
                }
                select_member(form, name, &option)?;
                Ok(true)
            }
            Target::Field {
                name,
                kind: FieldKind::Dropdown,
            } => {
                let option = descriptor.content();
                if option.is_empty() {
                    return Ok(false);
                }
                form.select_dropdown(name, &option)?;
                Ok(true)
            }
            Target::GroupOption { group, option } => {
                let selected = groups
                    .get(group)
                    .and_then(|selection| selection.selected.clone())
                    .or_else(|| descriptor.is_selected().then(|| option.clone()));
                match selected {
                    Some(selected) => {
                        select_member(form, group, &selected)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }
}

/// Exact name first (including historical aliases), then the owning radio group.
fn resolve(registry: &HashMap<String, FieldKind>, name: &str) -> Option<Target> {
    let candidates: Vec<&str> = std::iter::once(name)
        .chain(aliases::alternates(name))
        .collect();

    for candidate in &candidates {
        if let Some(kind) = registry.get(*candidate) {
            return Some(Target::Field {
                name: (*candidate).to_string(),
                kind: *kind,
            });
        }
    }

    candidates.iter().find_map(|candidate| {
        let (group, option) = split_choice_name(candidate)?;
        (registry.get(group) == Some(&FieldKind::Choice)).then(|| Target::GroupOption {
            group: group.to_string(),
            option: option.to_string(),
        })
    })
}

fn prescan(
    descriptors: &[FieldDescriptor],
    targets: &[Option<Target>],
    report: &mut FillReport,
) -> BTreeMap<String, GroupSelection> {
    let mut groups: BTreeMap<String, GroupSelection> = BTreeMap::new();

    for (descriptor, target) in descriptors.iter().zip(targets) {
        let Some(Target::GroupOption { group, option }) = target else {
            continue;
        };
        let selection = groups.entry(group.clone()).or_default();
        if !descriptor.is_selected() {
            continue;
        }

        if let Some(previous) = selection.selected.as_deref() {
            if previous != option {
                warn!(
                    group = %group,
                    previous,
                    option = %option,
                    "multiple options selected in radio group, keeping the later one"
                );
                if !report.radio_conflicts.contains(group) {
                    report.radio_conflicts.push(group.clone());
                }
            }
        }
        selection.selected = Some(option.clone());
    }

    groups
}

fn apply_group<F: FormDocument + ?Sized>(
    form: &mut F,
    group: &str,
    selected: Option<&str>,
) -> Result<(), FieldFault> {
    match selected {
        Some(option) => select_member(form, group, option),
        None => {
            debug!(group, "no option selected, clearing radio group");
            form.clear_choice(group)
        }
    }
}

fn select_member<F: FormDocument + ?Sized>(
    form: &mut F,
    group: &str,
    option: &str,
) -> Result<(), FieldFault> {
    if !form.options(group)?.iter().any(|known| known == option) {
        return Err(FieldFault::OptionNotFound {
            field: group.to_string(),
            option: option.to_string(),
        });
    }
    form.select_choice(group, option)
}
