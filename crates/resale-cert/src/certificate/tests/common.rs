use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde_json::{json, Value};

use crate::certificate::document::{FieldFault, FormDocument, FormField, FormValue};
use crate::certificate::manifest::{split_choice_name, FieldKind, FieldManifest};
use crate::certificate::repository::{
    CertificateId, CertificateRecord, CertificateRepository, DocumentStore, RepositoryError,
    StoreError, StoredDocument,
};
use crate::certificate::service::{ResaleCertificateService, ServiceSettings};
use crate::certificate::{ApplicationData, FieldMapper};

pub(super) const DELIVERY_OPTIONS: &[&str] = &["Email", "Mail", "Pickup"];
pub(super) const FREQUENCY_OPTIONS: &[&str] = &["Monthly", "Quarterly", "Annually"];

fn dropdown_options(name: &str) -> &'static [&'static str] {
    match name {
        "Assessment Frequency" => FREQUENCY_OPTIONS,
        _ => DELIVERY_OPTIONS,
    }
}

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 4, 30, 0).unwrap()
}

pub(super) fn mapper() -> FieldMapper {
    FieldMapper::new(FieldManifest::standard().expect("bundled manifest parses"))
}

pub(super) fn application(value: Value) -> ApplicationData {
    ApplicationData::new(value)
}

/// A fully answered application touching every section.
pub(super) fn complete_application() -> ApplicationData {
    application(json!({
        "associationName": "Maple Ridge Owners Association",
        "property": { "address": "14 Cedar Ct", "lotNumber": 42, "unitNumber": "B" },
        "seller": { "name": "Dana Whitfield" },
        "purchaser": { "name": "Jordan Ames" },
        "closingDate": "2025-04-30",
        "datePrepared": "2025-03-10T15:00:00Z",
        "deliveryMethod": "Email",
        "disclosures": {
            "assessments": {
                "amount": 325,
                "frequency": "Monthly",
                "unpaidAmount": "650.00",
                "lateFees": 25
            },
            "specialAssessments": { "exists": false, "amount": 1500 },
            "fees": {
                "transferFee": 200,
                "hasOtherFees": true,
                "otherFeesDescription": "Move-in deposit",
                "unpaidFeesAmount": "100"
            },
            "restraintsExist": true,
            "restraintsDescription": "Right of first refusal",
            "otherEntity": {
                "isLiable": true,
                "entities": [
                    { "name": "Acme HOA", "amountDue": "120.00" },
                    { "name": "Lakeside Master Association", "amountDue": 80 }
                ]
            },
            "reserves": {
                "totalAmount": 250000,
                "hasDesignated": true,
                "designatedProjects": [ { "project": "Roof", "amount": 40000 } ]
            },
            "insurance": {
                "carrier": "Mutual Property Co",
                "policies": [
                    { "description": "Master hazard", "articleSection": "Art. 9 Sec. 2", "certificateAttached": true },
                    { "description": "Liability", "articleSection": "" }
                ]
            },
            "litigation": { "pending": false, "description": "stale text" },
            "mortgageApproval": { "hasApprovals": true, "agencies": ["FHA", { "name": "VA" }] },
            "documents": { "declarationAttached": true, "bylawsAttached": "yes" }
        }
    }))
}

/// Field shapes the lopdf template builder can emit.
#[derive(Debug, Clone)]
pub(super) enum TemplateField {
    Text(String),
    Checkbox(String),
    Radio { name: String, options: Vec<String> },
    Dropdown { name: String, options: Vec<String> },
}

impl TemplateField {
    pub(super) fn text(name: &str) -> Self {
        Self::Text(name.to_string())
    }

    pub(super) fn checkbox(name: &str) -> Self {
        Self::Checkbox(name.to_string())
    }

    pub(super) fn radio(name: &str, options: &[&str]) -> Self {
        Self::Radio {
            name: name.to_string(),
            options: options.iter().map(|option| option.to_string()).collect(),
        }
    }

    pub(super) fn dropdown(name: &str, options: &[&str]) -> Self {
        Self::Dropdown {
            name: name.to_string(),
            options: options.iter().map(|option| option.to_string()).collect(),
        }
    }
}

/// Template fields matching the bundled manifest, minus `omit`. Choice entries are grouped
/// into radio fields named after the group.
pub(super) fn template_fields_from_manifest(omit: &[&str]) -> Vec<TemplateField> {
    let manifest = mapper().manifest().clone();
    let mut fields = Vec::new();
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for entry in manifest.entries() {
        if omit.contains(&entry.name.as_str()) {
            continue;
        }
        match entry.kind() {
            FieldKind::Text => fields.push(TemplateField::text(&entry.name)),
            FieldKind::Checkbox => fields.push(TemplateField::checkbox(&entry.name)),
            FieldKind::Dropdown => {
                fields.push(TemplateField::dropdown(&entry.name, dropdown_options(&entry.name)))
            }
            FieldKind::Choice => {
                let Some((group, option)) = split_choice_name(&entry.name) else {
                    continue;
                };
                if omit.contains(&group) {
                    continue;
                }
                match groups.iter_mut().find(|(name, _)| name == group) {
                    Some((_, options)) => options.push(option.to_string()),
                    None => groups.push((group.to_string(), vec![option.to_string()])),
                }
            }
        }
    }

    fields.extend(
        groups
            .into_iter()
            .map(|(name, options)| TemplateField::Radio { name, options }),
    );
    fields
}

/// Build a single-page AcroForm PDF with the given fields.
pub(super) fn build_template(fields: &[TemplateField]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let state_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
        },
        Vec::new(),
    ));

    let mut field_refs: Vec<Object> = Vec::new();
    let mut annots: Vec<Object> = Vec::new();
    let mut slot = 0_i64;
    let mut next_rect = || -> Vec<Object> {
        let x = 40 + (slot / 60) * 180;
        let y = 760 - (slot % 60) * 12;
        slot += 1;
        vec![x.into(), y.into(), (x + 160).into(), (y + 10).into()]
    };

    for field in fields {
        match field {
            TemplateField::Text(name) => {
                let id = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "FT" => "Tx",
                    "T" => Object::string_literal(name.as_str()),
                    "Rect" => next_rect(),
                    "P" => page_id,
                    "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
                });
                field_refs.push(id.into());
                annots.push(id.into());
            }
            TemplateField::Checkbox(name) => {
                let id = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "FT" => "Btn",
                    "T" => Object::string_literal(name.as_str()),
                    "Rect" => next_rect(),
                    "P" => page_id,
                    "V" => "Off",
                    "AS" => "Off",
                    "AP" => dictionary! {
                        "N" => dictionary! { "Yes" => state_id, "Off" => state_id },
                    },
                });
                field_refs.push(id.into());
                annots.push(id.into());
            }
            TemplateField::Radio { name, options } => {
                let parent_id = doc.new_object_id();
                let mut kids: Vec<Object> = Vec::new();
                for option in options {
                    let kid = doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Widget",
                        "Parent" => parent_id,
                        "Rect" => next_rect(),
                        "P" => page_id,
                        "AS" => "Off",
                        "AP" => dictionary! {
                            "N" => dictionary! { option.as_str() => state_id, "Off" => state_id },
                        },
                    });
                    kids.push(kid.into());
                    annots.push(kid.into());
                }
                doc.objects.insert(
                    parent_id,
                    dictionary! {
                        "FT" => "Btn",
                        "Ff" => 1_i64 << 15,
                        "T" => Object::string_literal(name.as_str()),
                        "V" => "Off",
                        "Kids" => kids,
                    }
                    .into(),
                );
                field_refs.push(parent_id.into());
            }
            TemplateField::Dropdown { name, options } => {
                let opt: Vec<Object> = options
                    .iter()
                    .map(|option| Object::string_literal(option.as_str()))
                    .collect();
                let id = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "FT" => "Ch",
                    "Ff" => 1_i64 << 17,
                    "T" => Object::string_literal(name.as_str()),
                    "Rect" => next_rect(),
                    "P" => page_id,
                    "Opt" => opt,
                    "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
                });
                field_refs.push(id.into());
                annots.push(id.into());
            }
        }
    }

    doc.objects.insert(
        page_id,
        dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => annots,
        }
        .into(),
    );
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1_i64,
        }
        .into(),
    );
    let acroform_id = doc.add_object(dictionary! {
        "Fields" => field_refs,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => font_id } },
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("template serializes");
    bytes
}

pub(super) fn standard_template() -> Vec<u8> {
    build_template(&template_fields_from_manifest(&[
        "Group_App3.Choice1",
        "Group_App3.Choice2",
    ]))
}

/// Single widget as recorded by [`MemoryForm`].
#[derive(Debug, Clone)]
pub(super) struct MemoryField {
    pub(super) kind: FieldKind,
    pub(super) value: FormValue,
    pub(super) options: Vec<String>,
}

/// In-memory registry double, independent of any PDF encoding.
#[derive(Debug, Default)]
pub(super) struct MemoryForm {
    pub(super) fields: BTreeMap<String, MemoryField>,
    /// Text fields whose appearance regeneration fails.
    pub(super) broken: HashSet<String>,
    pub(super) selections: Vec<(String, String)>,
}

impl MemoryForm {
    pub(super) fn with_text(mut self, name: &str) -> Self {
        self.insert(name, FieldKind::Text, FormValue::Text(String::new()), &[]);
        self
    }

    pub(super) fn with_checkbox(mut self, name: &str, checked: bool) -> Self {
        self.insert(name, FieldKind::Checkbox, FormValue::Checkbox(checked), &[]);
        self
    }

    pub(super) fn with_radio(mut self, name: &str, options: &[&str], selected: Option<&str>) -> Self {
        let value = FormValue::Choice(selected.map(str::to_string));
        self.insert(name, FieldKind::Choice, value, options);
        self
    }

    pub(super) fn with_dropdown(mut self, name: &str, options: &[&str]) -> Self {
        self.insert(name, FieldKind::Dropdown, FormValue::Dropdown(None), options);
        self
    }

    pub(super) fn broken_text(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    fn insert(&mut self, name: &str, kind: FieldKind, value: FormValue, options: &[&str]) {
        self.fields.insert(
            name.to_string(),
            MemoryField {
                kind,
                value,
                options: options.iter().map(|option| option.to_string()).collect(),
            },
        );
    }

    fn field_mut(&mut self, name: &str, expected: FieldKind) -> Result<&mut MemoryField, FieldFault> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| FieldFault::Unknown(name.to_string()))?;
        if field.kind != expected {
            return Err(FieldFault::KindMismatch {
                field: name.to_string(),
                expected,
                actual: field.kind,
            });
        }
        Ok(field)
    }

    pub(super) fn value(&self, name: &str) -> Option<&FormValue> {
        self.fields.get(name).map(|field| &field.value)
    }
}

impl FormDocument for MemoryForm {
    fn fields(&self) -> Vec<FormField> {
        self.fields
            .iter()
            .map(|(name, field)| FormField {
                name: name.clone(),
                kind: field.kind,
            })
            .collect()
    }

    fn values(&self) -> BTreeMap<String, FormValue> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }

    fn set_text(&mut self, name: &str, text: &str, _font_size: f32) -> Result<(), FieldFault> {
        let broken = self.broken.contains(name);
        let field = self.field_mut(name, FieldKind::Text)?;
        field.value = FormValue::Text(text.to_string());
        if broken {
            return Err(FieldFault::MissingRect(name.to_string()));
        }
        Ok(())
    }

    fn set_checked(&mut self, name: &str, checked: bool) -> Result<(), FieldFault> {
        self.field_mut(name, FieldKind::Checkbox)?.value = FormValue::Checkbox(checked);
        Ok(())
    }

    fn options(&self, name: &str) -> Result<Vec<String>, FieldFault> {
        self.fields
            .get(name)
            .map(|field| field.options.clone())
            .ok_or_else(|| FieldFault::Unknown(name.to_string()))
    }

    fn select_choice(&mut self, name: &str, option: &str) -> Result<(), FieldFault> {
        self.field_mut(name, FieldKind::Choice)?.value = FormValue::Choice(Some(option.to_string()));
        self.selections.push((name.to_string(), option.to_string()));
        Ok(())
    }

    fn clear_choice(&mut self, name: &str) -> Result<(), FieldFault> {
        self.field_mut(name, FieldKind::Choice)?.value = FormValue::Choice(None);
        Ok(())
    }

    fn select_dropdown(&mut self, name: &str, option: &str) -> Result<(), FieldFault> {
        let field = self.field_mut(name, FieldKind::Dropdown)?;
        if !field.options.iter().any(|known| known == option) {
            return Err(FieldFault::OptionNotFound {
                field: name.to_string(),
                option: option.to_string(),
            });
        }
        field.value = FormValue::Dropdown(Some(option.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub(super) fn puts(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

impl DocumentStore for MemoryStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<StoredDocument, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(StoredDocument {
            path: path.to_string(),
            url: format!("memory://{path}"),
            stored_at: fixed_now(),
        })
    }
}

pub(super) struct OfflineStore;

impl DocumentStore for OfflineStore {
    fn put(&self, _path: &str, _bytes: &[u8]) -> Result<StoredDocument, StoreError> {
        Err(StoreError::Unavailable("bucket offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) records: Mutex<HashMap<CertificateId, CertificateRecord>>,
}

impl CertificateRepository for MemoryRepository {
    fn save(&self, record: CertificateRecord) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.certificate_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &CertificateId) -> Result<Option<CertificateRecord>, RepositoryError> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }
}

pub(super) type MemoryService = ResaleCertificateService<MemoryStore, MemoryRepository>;

pub(super) fn build_service(
    template: Vec<u8>,
) -> (Arc<MemoryService>, Arc<MemoryStore>, Arc<MemoryRepository>) {
    let store = Arc::new(MemoryStore::default());
    let repository = Arc::new(MemoryRepository::default());
    let service = ResaleCertificateService::new(
        Arc::new(mapper()),
        template,
        store.clone(),
        repository.clone(),
        ServiceSettings {
            default_timezone: Some("America/New_York".to_string()),
            ..ServiceSettings::default()
        },
    );
    (Arc::new(service), store, repository)
}

pub(super) fn field_id(doc: &Document, name: &str) -> Option<ObjectId> {
    doc.objects.iter().find_map(|(id, object)| {
        let dict = object.as_dict().ok()?;
        let title = dict.get(b"T").ok()?;
        match title {
            Object::String(bytes, _) if bytes.as_slice() == name.as_bytes() => Some(*id),
            _ => None,
        }
    })
}
