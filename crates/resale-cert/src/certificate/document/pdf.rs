use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use super::{FieldFault, FormDocument, FormField, FormValue};
use crate::certificate::filler::FillError;
use crate::certificate::manifest::FieldKind;

const FLAG_RADIO: i64 = 1 << 15;
const FLAG_PUSHBUTTON: i64 = 1 << 16;
const FLAG_EDIT: i64 = 1 << 18;
const OFF: &[u8] = b"Off";
const DEFAULT_ON: &[u8] = b"Yes";
const FALLBACK_APPEARANCE: &str = "/Helv 0 Tf 0 g";
const AUTO_FONT_SIZE: f32 = 10.0;
const MAX_FIELD_DEPTH: usize = 32;

#[derive(Debug, Clone)]
struct PdfField {
    name: String,
    kind: FieldKind,
    id: ObjectId,
    widgets: Vec<ObjectId>,
    flags: i64,
}

#[derive(Clone, Copy, Default)]
struct Inherited<'a> {
    field_type: Option<&'a [u8]>,
    flags: i64,
}

/// AcroForm template opened from bytes, indexed by fully qualified field name.
pub struct PdfForm {
    document: Document,
    fields: Vec<PdfField>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for PdfForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfForm")
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl PdfForm {
    pub fn load(bytes: &[u8]) -> Result<Self, FillError> {
        let document = Document::load_mem(bytes).map_err(FillError::Load)?;
        Self::from_document(document)
    }

    pub fn from_document(document: Document) -> Result<Self, FillError> {
        let roots = root_fields(&document)?;
        let mut fields = Vec::new();
        let mut visited = HashSet::new();
        for id in roots {
            collect_fields(
                &document,
                id,
                None,
                Inherited::default(),
                0,
                &mut visited,
                &mut fields,
            );
        }

        let mut index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            index.entry(field.name.clone()).or_insert(position);
        }

        debug!(fields = fields.len(), "indexed template form fields");
        Ok(Self {
            document,
            fields,
            index,
        })
    }

    /// Serialize the document, asking viewers to regenerate field appearances.
    ///
    /// Fields stay editable; nothing is flattened.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, FillError> {
        if let Some(form) = self.acroform_mut() {
            form.set("NeedAppearances", true);
        }

        let mut buffer = Vec::new();
        self.document
            .save_to(&mut buffer)
            .map_err(|err| FillError::Save(err.into()))?;
        Ok(buffer)
    }

    fn field(&self, name: &str, expected: FieldKind) -> Result<PdfField, FieldFault> {
        let field = self
            .index
            .get(name)
            .map(|position| &self.fields[*position])
            .ok_or_else(|| FieldFault::Unknown(name.to_string()))?;

        if field.kind != expected {
            return Err(FieldFault::KindMismatch {
                field: name.to_string(),
                expected,
                actual: field.kind,
            });
        }
        Ok(field.clone())
    }

    fn dict(&self, id: ObjectId, name: &str) -> Result<&Dictionary, FieldFault> {
        self.document
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|err| malformed(name, err))
    }

    fn dict_mut(&mut self, id: ObjectId, name: &str) -> Result<&mut Dictionary, FieldFault> {
        self.document
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| malformed(name, err))
    }

    fn acroform(&self) -> Option<&Dictionary> {
        let root = self.document.trailer.get(b"Root").ok()?.as_reference().ok()?;
        let catalog = self.document.get_object(root).ok()?.as_dict().ok()?;
        resolve(&self.document, catalog.get(b"AcroForm").ok()?)?
            .as_dict()
            .ok()
    }

    fn acroform_mut(&mut self) -> Option<&mut Dictionary> {
        let root = self.document.trailer.get(b"Root").ok()?.as_reference().ok()?;
        let form_ref = self
            .document
            .get_object(root)
            .ok()?
            .as_dict()
            .ok()?
            .get(b"AcroForm")
            .ok()?
            .as_reference()
            .ok();

        match form_ref {
            Some(id) => self.document.get_object_mut(id).ok()?.as_dict_mut().ok(),
            None => self
                .document
                .get_object_mut(root)
                .ok()?
                .as_dict_mut()
                .ok()?
                .get_mut(b"AcroForm")
                .ok()?
                .as_dict_mut()
                .ok(),
        }
    }

    fn default_appearance(&self, field: &PdfField) -> DefaultAppearance {
        let own = self
            .dict(field.id, &field.name)
            .ok()
            .and_then(|dict| dict.get(b"DA").ok())
            .and_then(text_string);
        let form = self
            .acroform()
            .and_then(|form| form.get(b"DA").ok())
            .and_then(text_string);

        DefaultAppearance::parse(
            own.or(form)
                .as_deref()
                .unwrap_or(FALLBACK_APPEARANCE),
        )
    }

    fn appearance_resources(&self, font: &str) -> Object {
        if let Some(resources) = self.acroform().and_then(|form| form.get(b"DR").ok()) {
            return resources.clone();
        }

        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                font.to_string() => dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                },
            },
        })
    }

    fn widget_rect(&self, widget: ObjectId, name: &str) -> Result<[f32; 4], FieldFault> {
        let rect = self
            .dict(widget, name)?
            .get(b"Rect")
            .ok()
            .and_then(|rect| resolve(&self.document, rect))
            .and_then(|rect| rect.as_array().ok())
            .ok_or_else(|| FieldFault::MissingRect(name.to_string()))?;

        let values: Vec<f32> = rect.iter().filter_map(number).collect();
        match values.as_slice() {
            [x1, y1, x2, y2] => Ok([*x1, *y1, *x2, *y2]),
            _ => Err(FieldFault::MissingRect(name.to_string())),
        }
    }

    fn on_state(&self, widget: ObjectId) -> Option<Vec<u8>> {
        let dict = self.document.get_object(widget).ok()?.as_dict().ok()?;
        let appearance = resolve(&self.document, dict.get(b"AP").ok()?)?
            .as_dict()
            .ok()?;
        let normal = resolve(&self.document, appearance.get(b"N").ok()?)?
            .as_dict()
            .ok()?;
        normal
            .iter()
            .map(|(key, _)| key)
            .find(|key| key.as_slice() != OFF)
            .cloned()
    }

    fn field_options(&self, field: &PdfField) -> Vec<String> {
        self.dict(field.id, &field.name)
            .ok()
            .and_then(|dict| dict.get(b"Opt").ok())
            .and_then(|opt| resolve(&self.document, opt))
            .and_then(|opt| opt.as_array().ok())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match resolve(&self.document, entry)? {
                        Object::Array(pair) => pair.first().and_then(text_string),
                        other => text_string(other),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `(label, appearance state, widget)` for each radio widget.
    ///
    /// When the group carries `/Opt`, labels come from it by widget position; otherwise
    /// the appearance state name is the label.
    fn radio_states(&self, field: &PdfField) -> Vec<(String, Vec<u8>, ObjectId)> {
        let labels = self.field_options(field);
        field
            .widgets
            .iter()
            .enumerate()
            .filter_map(|(position, widget)| {
                let state = self.on_state(*widget)?;
                let label = labels
                    .get(position)
                    .cloned()
                    .unwrap_or_else(|| String::from_utf8_lossy(&state).into_owned());
                Some((label, state, *widget))
            })
            .collect()
    }

    fn set_radio_state(&mut self, field: &PdfField, state: &[u8]) -> Result<(), FieldFault> {
        let widget_states: Vec<(ObjectId, Option<Vec<u8>>)> = field
            .widgets
            .iter()
            .map(|widget| (*widget, self.on_state(*widget)))
            .collect();

        for (widget, own_state) in widget_states {
            let next = match own_state {
                Some(own) if own.as_slice() == state => own,
                _ => OFF.to_vec(),
            };
            self.dict_mut(widget, &field.name)?
                .set("AS", Object::Name(next));
        }

        self.dict_mut(field.id, &field.name)?
            .set("V", Object::Name(state.to_vec()));
        Ok(())
    }

    fn read_value(&self, field: &PdfField) -> FormValue {
        let value = self
            .dict(field.id, &field.name)
            .ok()
            .and_then(|dict| dict.get(b"V").ok())
            .and_then(|value| resolve(&self.document, value));

        match field.kind {
            FieldKind::Text => FormValue::Text(value.and_then(text_string).unwrap_or_default()),
            FieldKind::Checkbox => FormValue::Checkbox(matches!(
                value,
                Some(Object::Name(state)) if state.as_slice() != OFF
            )),
            FieldKind::Choice => {
                let selected = match value {
                    Some(Object::Name(state)) if state.as_slice() != OFF => {
                        let label = self
                            .radio_states(field)
                            .into_iter()
                            .find(|(_, own, _)| own == state)
                            .map(|(label, _, _)| label);
                        Some(label.unwrap_or_else(|| String::from_utf8_lossy(state).into_owned()))
                    }
                    _ => None,
                };
                FormValue::Choice(selected)
            }
            FieldKind::Dropdown => {
                FormValue::Dropdown(value.and_then(text_string).filter(|text| !text.is_empty()))
            }
        }
    }
}

impl FormDocument for PdfForm {
    fn fields(&self) -> Vec<FormField> {
        self.fields
            .iter()
            .map(|field| FormField {
                name: field.name.clone(),
                kind: field.kind,
            })
            .collect()
    }

    fn values(&self) -> BTreeMap<String, FormValue> {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), self.read_value(field)))
            .collect()
    }

    fn set_text(&mut self, name: &str, text: &str, font_size: f32) -> Result<(), FieldFault> {
        let field = self.field(name, FieldKind::Text)?;
        let appearance = self.default_appearance(&field).with_size(font_size);
        let resources = self.appearance_resources(&appearance.font);

        {
            let dict = self.dict_mut(field.id, name)?;
            dict.set("V", encode_text(text));
            dict.set("DA", Object::string_literal(appearance.to_string()));
        }

        for widget in &field.widgets {
            let rect = self.widget_rect(*widget, name)?;
            let stream = text_appearance(text, &appearance, rect, resources.clone())
                .map_err(|err| malformed(name, err))?;
            let stream_id = self.document.add_object(stream);

            let widget_dict = self.dict_mut(*widget, name)?;
            widget_dict.set("AP", dictionary! { "N" => stream_id });
            if *widget != field.id && widget_dict.has(b"DA") {
                widget_dict.set("DA", Object::string_literal(appearance.to_string()));
            }
        }

        Ok(())
    }

    fn set_checked(&mut self, name: &str, checked: bool) -> Result<(), FieldFault> {
        let field = self.field(name, FieldKind::Checkbox)?;
        let mut field_state = None;

        for widget in &field.widgets {
            let state = if checked {
                self.on_state(*widget).unwrap_or_else(|| DEFAULT_ON.to_vec())
            } else {
                OFF.to_vec()
            };
            field_state.get_or_insert_with(|| state.clone());
            self.dict_mut(*widget, name)?
                .set("AS", Object::Name(state));
        }

        let state = field_state.unwrap_or_else(|| {
            if checked {
                DEFAULT_ON.to_vec()
            } else {
                OFF.to_vec()
            }
        });
        self.dict_mut(field.id, name)?.set("V", Object::Name(state));
        Ok(())
    }

    fn options(&self, name: &str) -> Result<Vec<String>, FieldFault> {
        let position = self
            .index
            .get(name)
            .ok_or_else(|| FieldFault::Unknown(name.to_string()))?;
        let field = &self.fields[*position];

        match field.kind {
            FieldKind::Choice => {
                let mut labels: Vec<String> = Vec::new();
                for (label, _, _) in self.radio_states(field) {
                    if !labels.contains(&label) {
                        labels.push(label);
                    }
                }
                Ok(labels)
            }
            FieldKind::Dropdown => Ok(self.field_options(field)),
            actual => Err(FieldFault::KindMismatch {
                field: name.to_string(),
                expected: FieldKind::Choice,
                actual,
            }),
        }
    }

    fn select_choice(&mut self, name: &str, option: &str) -> Result<(), FieldFault> {
        let field = self.field(name, FieldKind::Choice)?;
        let state = self
            .radio_states(&field)
            .into_iter()
            .find(|(label, _, _)| label == option)
            .map(|(_, state, _)| state)
            .ok_or_else(|| FieldFault::OptionNotFound {
                field: name.to_string(),
                option: option.to_string(),
            })?;

        self.set_radio_state(&field, &state)
    }

    fn clear_choice(&mut self, name: &str) -> Result<(), FieldFault> {
        let field = self.field(name, FieldKind::Choice)?;
        self.set_radio_state(&field, OFF)
    }

    fn select_dropdown(&mut self, name: &str, option: &str) -> Result<(), FieldFault> {
        let field = self.field(name, FieldKind::Dropdown)?;
        let editable = field.flags & FLAG_EDIT != 0;
        if !editable && !self.field_options(&field).iter().any(|known| known == option) {
            return Err(FieldFault::OptionNotFound {
                field: name.to_string(),
                option: option.to_string(),
            });
        }

        self.dict_mut(field.id, name)?.set("V", encode_text(option));
        for widget in &field.widgets {
            self.dict_mut(*widget, name)?.remove(b"AP");
        }
        Ok(())
    }
}

/// Parsed `/DA` string: font resource name, size, and any remaining operators.
#[derive(Debug, Clone, PartialEq)]
struct DefaultAppearance {
    font: String,
    size: f32,
    rest: String,
}

impl DefaultAppearance {
    fn parse(raw: &str) -> Self {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let Some(tf) = tokens.iter().position(|token| *token == "Tf") else {
            return Self {
                font: "Helv".to_string(),
                size: 0.0,
                rest: raw.trim().to_string(),
            };
        };

        let font = tf
            .checked_sub(2)
            .and_then(|idx| tokens.get(idx))
            .map(|token| token.trim_start_matches('/').to_string())
            .filter(|font| !font.is_empty())
            .unwrap_or_else(|| "Helv".to_string());
        let size = tf
            .checked_sub(1)
            .and_then(|idx| tokens.get(idx))
            .and_then(|token| token.parse::<f32>().ok())
            .unwrap_or(0.0);
        let rest = tokens
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx + 2 < tf || *idx > tf)
            .map(|(_, token)| *token)
            .collect::<Vec<_>>()
            .join(" ");

        Self { font, size, rest }
    }

    fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    fn render_size(&self) -> f32 {
        if self.size > 0.0 {
            self.size
        } else {
            AUTO_FONT_SIZE
        }
    }
}

impl fmt::Display for DefaultAppearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{} {} Tf", self.font, self.size)?;
        if !self.rest.is_empty() {
            write!(f, " {}", self.rest)?;
        }
        Ok(())
    }
}

fn text_appearance(
    text: &str,
    appearance: &DefaultAppearance,
    rect: [f32; 4],
    resources: Object,
) -> Result<Stream, lopdf::Error> {
    let width = (rect[2] - rect[0]).abs();
    let height = (rect[3] - rect[1]).abs();
    let size = appearance.render_size();
    let baseline = ((height - size) / 2.0 + size * 0.22).max(1.0);

    let mut operations = vec![
        Operation::new("BMC", vec!["Tx".into()]),
        Operation::new("q", vec![]),
        Operation::new(
            "re",
            vec![
                1.into(),
                1.into(),
                (width - 2.0).max(0.0).into(),
                (height - 2.0).max(0.0).into(),
            ],
        ),
        Operation::new("W", vec![]),
        Operation::new("n", vec![]),
    ];

    if !text.is_empty() {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![appearance.font.as_str().into(), size.into()],
            ),
            Operation::new("g", vec![0.into()]),
            Operation::new("Td", vec![2.into(), baseline.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(latin1(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    operations.push(Operation::new("Q", vec![]));
    operations.push(Operation::new("EMC", vec![]));

    let content = Content { operations }.encode()?;
    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => resources,
        },
        content,
    ))
}

fn root_fields(document: &Document) -> Result<Vec<ObjectId>, FillError> {
    let root = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(FillError::Load)?;
    let catalog = document
        .get_object(root)
        .and_then(Object::as_dict)
        .map_err(FillError::Load)?;

    let form = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|form| resolve(document, form))
        .and_then(|form| form.as_dict().ok())
        .ok_or(FillError::MissingForm)?;

    Ok(form
        .get(b"Fields")
        .ok()
        .and_then(|fields| resolve(document, fields))
        .and_then(|fields| fields.as_array().ok())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| field.as_reference().ok())
                .collect()
        })
        .unwrap_or_default())
}

fn collect_fields<'a>(
    document: &'a Document,
    id: ObjectId,
    parent: Option<&str>,
    inherited: Inherited<'a>,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<PdfField>,
) {
    if depth > MAX_FIELD_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(dict) = document.get_object(id).and_then(Object::as_dict) else {
        return;
    };
    let Some(partial) = dict.get(b"T").ok().and_then(text_string) else {
        return;
    };
    let name = match parent {
        Some(parent) => format!("{parent}.{partial}"),
        None => partial,
    };

    let field_type = dict
        .get(b"FT")
        .ok()
        .and_then(name_bytes)
        .or(inherited.field_type);
    let flags = dict
        .get(b"Ff")
        .ok()
        .and_then(|flags| flags.as_i64().ok())
        .unwrap_or(inherited.flags);
    let kids = kid_ids(document, dict);
    let kind = classify(field_type, flags);
    let field_kids: Vec<ObjectId> = kids
        .iter()
        .copied()
        .filter(|kid| has_partial_name(document, *kid))
        .collect();

    if kind == Some(FieldKind::Choice) || field_kids.is_empty() {
        let Some(kind) = kind else {
            debug!(field = %name, "skipping unsupported form field type");
            return;
        };
        let widgets = if kids.is_empty() {
            vec![id]
        } else if kind == FieldKind::Choice {
            let mut leaves = Vec::new();
            for kid in &kids {
                leaf_widgets(document, *kid, depth + 1, &mut leaves);
            }
            leaves
        } else {
            kids
        };

        out.push(PdfField {
            name,
            kind,
            id,
            widgets,
            flags,
        });
        return;
    }

    let next = Inherited { field_type, flags };
    for kid in field_kids {
        collect_fields(document, kid, Some(name.as_str()), next, depth + 1, visited, out);
    }
}

fn leaf_widgets(document: &Document, id: ObjectId, depth: usize, out: &mut Vec<ObjectId>) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    let kids = document
        .get_object(id)
        .and_then(Object::as_dict)
        .map(|dict| kid_ids(document, dict))
        .unwrap_or_default();

    if kids.is_empty() {
        out.push(id);
    } else {
        for kid in kids {
            leaf_widgets(document, kid, depth + 1, out);
        }
    }
}

fn kid_ids(document: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    dict.get(b"Kids")
        .ok()
        .and_then(|kids| resolve(document, kids))
        .and_then(|kids| kids.as_array().ok())
        .map(|kids| kids.iter().filter_map(|kid| kid.as_reference().ok()).collect())
        .unwrap_or_default()
}

fn has_partial_name(document: &Document, id: ObjectId) -> bool {
    document
        .get_object(id)
        .and_then(Object::as_dict)
        .map(|dict| dict.has(b"T"))
        .unwrap_or(false)
}

fn classify(field_type: Option<&[u8]>, flags: i64) -> Option<FieldKind> {
    match field_type? {
        b"Tx" => Some(FieldKind::Text),
        b"Btn" if flags & FLAG_PUSHBUTTON != 0 => None,
        b"Btn" if flags & FLAG_RADIO != 0 => Some(FieldKind::Choice),
        b"Btn" => Some(FieldKind::Checkbox),
        b"Ch" => Some(FieldKind::Dropdown),
        _ => None,
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn name_bytes(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn text_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|byte| char::from(*byte)).collect()
}

fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

fn malformed(name: &str, err: impl fmt::Display) -> FieldFault {
    FieldFault::Malformed {
        field: name.to_string(),
        detail: err.to_string(),
    }
}
