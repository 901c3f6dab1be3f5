//! Fields whose names encode a 1-based row number into a source array.

use serde_json::Value;

use super::data::{is_truthy, lookup_in, ApplicationData};
use super::descriptor::FieldValue;
use super::format;
use super::rules::RuleFault;

const LIABLE_FLAG: &str = "disclosures.otherEntity.isLiable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    LiableEntities,
    DesignatedProjects,
    InsuranceCoverage,
    MortgageAgencies,
}

impl Family {
    pub(crate) fn array_path(self) -> &'static str {
        match self {
            Family::LiableEntities => "disclosures.otherEntity.entities",
            Family::DesignatedProjects => "disclosures.reserves.designatedProjects",
            Family::InsuranceCoverage => "disclosures.insurance.policies",
            Family::MortgageAgencies => "disclosures.mortgageApproval.agencies",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    EntityName,
    EntityAmount,
    ProjectName,
    ProjectAmount,
    CoverageDescription,
    CoverageArticle,
    CertificateAttached,
    SeeArticleSection,
    Agency,
}

impl Column {
    fn family(self) -> Family {
        match self {
            Column::EntityName | Column::EntityAmount => Family::LiableEntities,
            Column::ProjectName | Column::ProjectAmount => Family::DesignatedProjects,
            Column::CoverageDescription
            | Column::CoverageArticle
            | Column::CertificateAttached
            | Column::SeeArticleSection => Family::InsuranceCoverage,
            Column::Agency => Family::MortgageAgencies,
        }
    }

    fn is_flag(self) -> bool {
        matches!(self, Column::CertificateAttached | Column::SeeArticleSection)
    }

    fn empty(self) -> FieldValue {
        if self.is_flag() {
            FieldValue::Flag(false)
        } else {
            FieldValue::Text(String::new())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Numbering {
    /// `NameRow3`
    Plain,
    /// `Name-03`
    ZeroPadded,
}

struct RowColumn {
    prefix: &'static str,
    numbering: Numbering,
    column: Column,
}

const ROW_COLUMNS: &[RowColumn] = &[
    RowColumn {
        prefix: "EntityFacility NameRow",
        numbering: Numbering::Plain,
        column: Column::EntityName,
    },
    RowColumn {
        prefix: "Amount DueRow",
        numbering: Numbering::Plain,
        column: Column::EntityAmount,
    },
    RowColumn {
        prefix: "Designated Project-",
        numbering: Numbering::ZeroPadded,
        column: Column::ProjectName,
    },
    RowColumn {
        prefix: "Designated Amount-",
        numbering: Numbering::ZeroPadded,
        column: Column::ProjectAmount,
    },
    RowColumn {
        prefix: "Insurance DescriptionRow",
        numbering: Numbering::Plain,
        column: Column::CoverageDescription,
    },
    RowColumn {
        prefix: "Insurance Article SectionRow",
        numbering: Numbering::Plain,
        column: Column::CoverageArticle,
    },
    RowColumn {
        prefix: "Certificate AttachedRow",
        numbering: Numbering::Plain,
        column: Column::CertificateAttached,
    },
    RowColumn {
        prefix: "See Article SectionRow",
        numbering: Numbering::Plain,
        column: Column::SeeArticleSection,
    },
    RowColumn {
        prefix: "Mortgage Agency-",
        numbering: Numbering::ZeroPadded,
        column: Column::Agency,
    },
];

/// A parsed row field: which column, and the 1-based row number from the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowField {
    pub(crate) column: Column,
    pub(crate) row: usize,
}

impl RowField {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        ROW_COLUMNS.iter().find_map(|candidate| {
            let digits = name.strip_prefix(candidate.prefix)?;
            let row = parse_row(digits, candidate.numbering)?;
            Some(RowField {
                column: candidate.column,
                row,
            })
        })
    }

    pub(crate) fn family(&self) -> Family {
        self.column.family()
    }

    /// `true` when the backing array has at least one element.
    pub(crate) fn has_rows(&self, data: &ApplicationData) -> bool {
        !data.items(self.family().array_path()).is_empty()
    }

    pub(crate) fn evaluate(&self, data: &ApplicationData) -> Result<FieldValue, RuleFault> {
        let items = data.items(self.family().array_path());
        let Some(item) = self.row.checked_sub(1).and_then(|index| items.get(index)) else {
            return Ok(self.column.empty());
        };

        match self.column {
            Column::EntityName => {
                if !data.flag(LIABLE_FLAG) {
                    return Ok(self.column.empty());
                }
                let name = text_at(item, "name")?;
                let amount = currency_at(item, "amountDue")?;
                let combined = match (name.is_empty(), amount.is_empty()) {
                    (false, false) => format!("{name} - {amount}"),
                    (false, true) => name,
                    (true, _) => amount,
                };
                Ok(FieldValue::Text(combined))
            }
            Column::EntityAmount => {
                if !data.flag(LIABLE_FLAG) {
                    return Ok(self.column.empty());
                }
                currency_at(item, "amountDue").map(FieldValue::Text)
            }
            Column::ProjectName => text_at(item, "project").map(FieldValue::Text),
            Column::ProjectAmount => currency_at(item, "amount").map(FieldValue::Text),
            Column::CoverageDescription => text_at(item, "description").map(FieldValue::Text),
            Column::CoverageArticle => text_at(item, "articleSection").map(FieldValue::Text),
            Column::CertificateAttached => Ok(FieldValue::Flag(
                lookup_in(item, "certificateAttached")
                    .map(is_truthy)
                    .unwrap_or(false),
            )),
            Column::SeeArticleSection => Ok(FieldValue::Flag(
                !text_at(item, "articleSection")?.is_empty(),
            )),
            Column::Agency => match item {
                Value::String(_) => format::text_of(item).map(FieldValue::Text),
                _ => text_at(item, "name").map(FieldValue::Text),
            },
        }
    }
}

fn parse_row(digits: &str, numbering: Numbering) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if matches!(numbering, Numbering::ZeroPadded) && digits.len() < 2 {
        return None;
    }
    digits.parse::<usize>().ok().filter(|row| *row >= 1)
}

fn text_at(item: &Value, key: &str) -> Result<String, RuleFault> {
    lookup_in(item, key)
        .map(format::text_of)
        .unwrap_or_else(|| Ok(String::new()))
}

fn currency_at(item: &Value, key: &str) -> Result<String, RuleFault> {
    lookup_in(item, key)
        .map(format::currency)
        .unwrap_or_else(|| Ok(String::new()))
}
