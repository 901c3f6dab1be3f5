use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::aliases;
use super::data::ApplicationData;
use super::descriptor::{FieldDescriptor, FieldValue};
use super::families::RowField;
use super::format::resolve_timezone;
use super::manifest::{FieldKind, FieldManifest, RUNTIME_CHECKBOXES};
use super::mapping;
use super::rules::{MapContext, Rule, RuleFault};

/// Projects an application onto the flat field namespace of one template revision.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    manifest: FieldManifest,
}

enum Source {
    Rule(&'static Rule),
    Row(RowField),
    Unchecked,
}

impl FieldMapper {
    /// The runtime-only checkboxes are unioned into `manifest` here.
    pub fn new(manifest: FieldManifest) -> Self {
        Self {
            manifest: manifest.with_runtime_checkboxes(RUNTIME_CHECKBOXES),
        }
    }

    pub fn manifest(&self) -> &FieldManifest {
        &self.manifest
    }

    pub fn map(&self, data: &ApplicationData, timezone: Option<&str>) -> Vec<FieldDescriptor> {
        self.map_at(data, timezone, Utc::now())
    }

    /// Same as [`FieldMapper::map`] with an explicit clock.
    ///
    /// One descriptor is produced per relevant manifest field, in manifest order. Missing
    /// data never fails the pass; a field whose rule faults falls back to its empty value.
    pub fn map_at(
        &self,
        data: &ApplicationData,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<FieldDescriptor> {
        let ctx = MapContext::new(resolve_timezone(timezone), now);
        let mut descriptors = Vec::with_capacity(self.manifest.len());

        for entry in self.manifest.entries() {
            let kind = entry.kind();
            let Some(source) = select_source(&entry.name, kind, data) else {
                continue;
            };

            let value = match evaluate(&source, data, &ctx) {
                Ok(value) => value,
                Err(fault) => {
                    warn!(field = %entry.name, %kind, %fault, "mapping rule failed, using empty value");
                    FieldValue::empty_for(kind)
                }
            };

            debug!(field = %entry.name, %kind, ?value, "mapped field");
            descriptors.push(FieldDescriptor::for_kind(entry.name.clone(), kind, value));
        }

        descriptors
    }
}

fn select_source(name: &str, kind: FieldKind, data: &ApplicationData) -> Option<Source> {
    if let Some(rule) = mapping::rule_for(aliases::canonical(name)) {
        return Some(Source::Rule(rule));
    }

    if let Some(row) = RowField::parse(name) {
        if kind.is_boolean() || row.has_rows(data) {
            return Some(Source::Row(row));
        }
        return None;
    }

    if kind.is_boolean() {
        return Some(Source::Unchecked);
    }

    None
}

fn evaluate(
    source: &Source,
    data: &ApplicationData,
    ctx: &MapContext,
) -> Result<FieldValue, RuleFault> {
    match source {
        Source::Rule(rule) => rule.evaluate(data, ctx),
        Source::Row(row) => row.evaluate(data),
        Source::Unchecked => Ok(FieldValue::Flag(false)),
    }
}
