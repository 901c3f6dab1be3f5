//! Declarative field rules and their interpreter.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::data::ApplicationData;
use super::descriptor::FieldValue;
use super::format;

/// Per-call inputs shared by every rule.
#[derive(Debug, Clone, Copy)]
pub struct MapContext {
    pub timezone: Tz,
    pub now: DateTime<Utc>,
}

impl MapContext {
    pub fn new(timezone: Tz, now: DateTime<Utc>) -> Self {
        Self { timezone, now }
    }
}

pub type DerivedRule = fn(&ApplicationData, &MapContext) -> Result<FieldValue, RuleFault>;

/// How one field's value is computed from the application.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Scalar at a path rendered as text.
    Text(&'static str),
    /// Number at a path rendered as `$1,234.00`.
    Currency(&'static str),
    /// Date or timestamp at a path rendered as `MM/DD/YYYY`.
    Date(&'static str),
    /// Date at a path, defaulting to today in the requested zone when absent.
    DateOrToday(&'static str),
    /// Checkbox state from a truthy test on a path.
    Flag(&'static str),
    /// "Yes" half of a choice pair: set only when the source is explicitly true.
    Yes(&'static str),
    /// "No" half of a choice pair: set only when the source is explicitly false.
    No(&'static str),
    /// Inner rule, blanked unless the governing flag is truthy.
    ClearUnless {
        flag: &'static str,
        rule: &'static Rule,
    },
    /// Hand-written computation for values that combine several sources.
    Derived(DerivedRule),
}

impl Rule {
    pub fn evaluate(
        &self,
        data: &ApplicationData,
        ctx: &MapContext,
    ) -> Result<FieldValue, RuleFault> {
        match self {
            Rule::Text(path) => data
                .lookup(path)
                .map(format::text_of)
                .unwrap_or_else(|| Ok(String::new()))
                .map(FieldValue::Text),
            Rule::Currency(path) => data
                .lookup(path)
                .map(format::currency)
                .unwrap_or_else(|| Ok(String::new()))
                .map(FieldValue::Text),
            Rule::Date(path) => data
                .lookup(path)
                .map(|value| format::date(value, ctx.timezone))
                .unwrap_or_else(|| Ok(String::new()))
                .map(FieldValue::Text),
            Rule::DateOrToday(path) => {
                let stored = match data.lookup(path) {
                    Some(value) => format::date(value, ctx.timezone)?,
                    None => String::new(),
                };
                if stored.is_empty() {
                    Ok(FieldValue::Text(format::today(ctx.now, ctx.timezone)))
                } else {
                    Ok(FieldValue::Text(stored))
                }
            }
            Rule::Flag(path) => Ok(FieldValue::Flag(data.flag(path))),
            Rule::Yes(path) => Ok(FieldValue::Flag(data.tri_state(path) == Some(true))),
            Rule::No(path) => Ok(FieldValue::Flag(data.tri_state(path) == Some(false))),
            Rule::ClearUnless { flag, rule } => {
                if data.flag(flag) {
                    rule.evaluate(data, ctx)
                } else {
                    Ok(rule.cleared())
                }
            }
            Rule::Derived(compute) => compute(data, ctx),
        }
    }

    /// Empty value of the shape this rule produces.
    fn cleared(&self) -> FieldValue {
        match self {
            Rule::Flag(_) | Rule::Yes(_) | Rule::No(_) => FieldValue::Flag(false),
            Rule::ClearUnless { rule, .. } => rule.cleared(),
            _ => FieldValue::Text(String::new()),
        }
    }
}

/// Recoverable failure while computing a single field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleFault {
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{raw}' is not a number")]
    InvalidNumber { raw: String },
    #[error("'{raw}' is not a recognised date")]
    InvalidDate { raw: String },
}
