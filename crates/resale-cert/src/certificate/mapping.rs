//! Field name → rule table for the resale certificate template.
//!
//! Legacy names (see [`super::aliases`]) are not listed; they resolve to the canonical
//! entry at lookup time. Row families such as `EntityFacility NameRowN` live in
//! [`super::families`].

use std::collections::HashMap;
use std::sync::OnceLock;

use super::data::ApplicationData;
use super::descriptor::FieldValue;
use super::format;
use super::rules::{MapContext, Rule, RuleFault};

static FIELD_RULE_MAP: OnceLock<HashMap<&'static str, Rule>> = OnceLock::new();

pub(crate) fn rule_for(name: &str) -> Option<&'static Rule> {
    field_rule_map().get(name)
}

#[cfg(test)]
pub(crate) fn rule_names() -> impl Iterator<Item = &'static str> {
    FIELD_RULES.iter().map(|(name, _)| *name)
}

fn field_rule_map() -> &'static HashMap<&'static str, Rule> {
    FIELD_RULE_MAP.get_or_init(|| {
        let mut map = HashMap::with_capacity(FIELD_RULES.len());
        for (name, rule) in FIELD_RULES {
            map.insert(*name, *rule);
        }
        map
    })
}

const FIELD_RULES: &[(&str, Rule)] = &[
    // Property & parties
    ("Association Name", Rule::Text("associationName")),
    ("Property Address", Rule::Text("property.address")),
    ("Lot Number", Rule::Text("property.lotNumber")),
    ("Unit Number", Rule::Text("property.unitNumber")),
    ("Tax Map Number", Rule::Text("property.taxMapNumber")),
    ("Seller Name", Rule::Text("seller.name")),
    ("Purchaser Name", Rule::Text("purchaser.name")),
    ("Closing Date", Rule::Date("closingDate")),
    ("Date Prepared", Rule::DateOrToday("datePrepared")),
    ("Preparer Name", Rule::Text("preparer.name")),
    ("Preparer Title", Rule::Text("preparer.title")),
    ("Preparer Phone", Rule::Text("preparer.phone")),
    ("Preparer Email", Rule::Text("preparer.email")),
    ("Order Number", Rule::Text("orderNumber")),
    ("Delivery Method", Rule::Text("deliveryMethod")),
    // Managing agent
    (
        "Management Company",
        Rule::Text("disclosures.managingAgent.company"),
    ),
    (
        "Management Address",
        Rule::Text("disclosures.managingAgent.address"),
    ),
    (
        "Management Phone",
        Rule::Text("disclosures.managingAgent.phone"),
    ),
    // Regular assessments
    (
        "Assessment Amount",
        Rule::Currency("disclosures.assessments.amount"),
    ),
    (
        "Assessment Frequency",
        Rule::Text("disclosures.assessments.frequency"),
    ),
    (
        "Assessment Due Date",
        Rule::Date("disclosures.assessments.dueDate"),
    ),
    (
        "Current Assessment Balance",
        Rule::Currency("disclosures.assessments.currentBalance"),
    ),
    (
        "Unpaid Assessments",
        Rule::Currency("disclosures.assessments.unpaidAmount"),
    ),
    ("Late Fees", Rule::Currency("disclosures.assessments.lateFees")),
    // Special assessments
    (
        "Group20.Choice1",
        Rule::Yes("disclosures.specialAssessments.exists"),
    ),
    (
        "Group20.Choice2",
        Rule::No("disclosures.specialAssessments.exists"),
    ),
    (
        "Special Assessment Amount",
        Rule::ClearUnless {
            flag: "disclosures.specialAssessments.exists",
            rule: &Rule::Currency("disclosures.specialAssessments.amount"),
        },
    ),
    (
        "Special Assessment Description",
        Rule::ClearUnless {
            flag: "disclosures.specialAssessments.exists",
            rule: &Rule::Text("disclosures.specialAssessments.description"),
        },
    ),
    (
        "Special Assessment Due Date",
        Rule::ClearUnless {
            flag: "disclosures.specialAssessments.exists",
            rule: &Rule::Date("disclosures.specialAssessments.dueDate"),
        },
    ),
    // Fees
    ("Transfer Fee", Rule::Currency("disclosures.fees.transferFee")),
    (
        "Capital Contribution",
        Rule::Currency("disclosures.fees.capitalContribution"),
    ),
    (
        "Resale Certificate Fee",
        Rule::Currency("disclosures.fees.certificateFee"),
    ),
    ("Group2.Choice1", Rule::Yes("disclosures.fees.hasOtherFees")),
    ("Group2.Choice2", Rule::No("disclosures.fees.hasOtherFees")),
    (
        "Other Fees Description",
        Rule::ClearUnless {
            flag: "disclosures.fees.hasOtherFees",
            rule: &Rule::Text("disclosures.fees.otherFeesDescription"),
        },
    ),
    (
        "Unpaid Fees",
        Rule::ClearUnless {
            flag: "disclosures.fees.hasOtherFees",
            rule: &Rule::Currency("disclosures.fees.unpaidFeesAmount"),
        },
    ),
    ("Total Amount Due", Rule::Derived(total_amount_due)),
    // Restraints on alienability
    ("Group3.Choice1", Rule::Yes("disclosures.restraintsExist")),
    ("Group3.Choice2", Rule::No("disclosures.restraintsExist")),
    (
        "Restraints Description",
        Rule::ClearUnless {
            flag: "disclosures.restraintsExist",
            rule: &Rule::Text("disclosures.restraintsDescription"),
        },
    ),
    // Other entities or facilities the owner is liable to
    ("Group1.Choice1", Rule::Yes("disclosures.otherEntity.isLiable")),
    ("Group1.Choice2", Rule::No("disclosures.otherEntity.isLiable")),
    // Approved capital expenditures
    (
        "Group4.Choice1",
        Rule::Yes("disclosures.capitalExpenditures.approved"),
    ),
    (
        "Group4.Choice2",
        Rule::No("disclosures.capitalExpenditures.approved"),
    ),
    (
        "Capital Expenditure Description",
        Rule::ClearUnless {
            flag: "disclosures.capitalExpenditures.approved",
            rule: &Rule::Text("disclosures.capitalExpenditures.description"),
        },
    ),
    (
        "Capital Expenditure Amount",
        Rule::ClearUnless {
            flag: "disclosures.capitalExpenditures.approved",
            rule: &Rule::Currency("disclosures.capitalExpenditures.amount"),
        },
    ),
    // Reserves
    (
        "Total Reserves",
        Rule::Currency("disclosures.reserves.totalAmount"),
    ),
    (
        "Reserve Study Date",
        Rule::Date("disclosures.reserves.studyDate"),
    ),
    ("Group5.Choice1", Rule::Yes("disclosures.reserves.hasDesignated")),
    ("Group5.Choice2", Rule::No("disclosures.reserves.hasDesignated")),
    // Financial documents
    (
        "Balance Sheet Attached",
        Rule::Flag("disclosures.financials.balanceSheetAttached"),
    ),
    (
        "Income Statement Attached",
        Rule::Flag("disclosures.financials.incomeStatementAttached"),
    ),
    (
        "Budget Attached",
        Rule::Flag("disclosures.financials.budgetAttached"),
    ),
    (
        "Reserve Study Attached",
        Rule::Flag("disclosures.reserves.studyAttached"),
    ),
    // Litigation
    ("Group6.Choice1", Rule::Yes("disclosures.litigation.pending")),
    ("Group6.Choice2", Rule::No("disclosures.litigation.pending")),
    (
        "Litigation Description",
        Rule::ClearUnless {
            flag: "disclosures.litigation.pending",
            rule: &Rule::Text("disclosures.litigation.description"),
        },
    ),
    // Insurance
    ("Insurance Carrier", Rule::Text("disclosures.insurance.carrier")),
    (
        "Group7.Choice1",
        Rule::Yes("disclosures.insurance.ownerCoverageRecommended"),
    ),
    (
        "Group7.Choice2",
        Rule::No("disclosures.insurance.ownerCoverageRecommended"),
    ),
    (
        "Owner Coverage Description",
        Rule::ClearUnless {
            flag: "disclosures.insurance.ownerCoverageRecommended",
            rule: &Rule::Text("disclosures.insurance.ownerCoverageDescription"),
        },
    ),
    // Unresolved violations
    ("Group8.Choice1", Rule::Yes("disclosures.violations.exists")),
    ("Group8.Choice2", Rule::No("disclosures.violations.exists")),
    (
        "Violation Description",
        Rule::ClearUnless {
            flag: "disclosures.violations.exists",
            rule: &Rule::Text("disclosures.violations.description"),
        },
    ),
    (
        "Violation Notice Attached",
        Rule::ClearUnless {
            flag: "disclosures.violations.exists",
            rule: &Rule::Flag("disclosures.violations.noticeAttached"),
        },
    ),
    // Use restrictions
    (
        "Group9.Choice1",
        Rule::Yes("disclosures.leasingRestrictions.exists"),
    ),
    (
        "Group9.Choice2",
        Rule::No("disclosures.leasingRestrictions.exists"),
    ),
    (
        "Leasing Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.leasingRestrictions.exists",
            rule: &Rule::Text("disclosures.leasingRestrictions.articleSection"),
        },
    ),
    (
        "Leasing Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.leasingRestrictions.exists",
            rule: &Rule::Text("disclosures.leasingRestrictions.description"),
        },
    ),
    ("Group10.Choice1", Rule::Yes("disclosures.petRestrictions.exists")),
    ("Group10.Choice2", Rule::No("disclosures.petRestrictions.exists")),
    (
        "Pet Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.petRestrictions.exists",
            rule: &Rule::Text("disclosures.petRestrictions.articleSection"),
        },
    ),
    (
        "Pet Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.petRestrictions.exists",
            rule: &Rule::Text("disclosures.petRestrictions.description"),
        },
    ),
    (
        "Group11.Choice1",
        Rule::Yes("disclosures.signRestrictions.exists"),
    ),
    ("Group11.Choice2", Rule::No("disclosures.signRestrictions.exists")),
    (
        "Sign Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.signRestrictions.exists",
            rule: &Rule::Text("disclosures.signRestrictions.articleSection"),
        },
    ),
    (
        "Sign Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.signRestrictions.exists",
            rule: &Rule::Text("disclosures.signRestrictions.description"),
        },
    ),
    (
        "Group12.Choice1",
        Rule::Yes("disclosures.flagRestrictions.exists"),
    ),
    ("Group12.Choice2", Rule::No("disclosures.flagRestrictions.exists")),
    (
        "Flag Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.flagRestrictions.exists",
            rule: &Rule::Text("disclosures.flagRestrictions.articleSection"),
        },
    ),
    (
        "Flag Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.flagRestrictions.exists",
            rule: &Rule::Text("disclosures.flagRestrictions.description"),
        },
    ),
    (
        "Group13.Choice1",
        Rule::Yes("disclosures.solarRestrictions.exists"),
    ),
    (
        "Group13.Choice2",
        Rule::No("disclosures.solarRestrictions.exists"),
    ),
    (
        "Solar Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.solarRestrictions.exists",
            rule: &Rule::Text("disclosures.solarRestrictions.articleSection"),
        },
    ),
    (
        "Solar Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.solarRestrictions.exists",
            rule: &Rule::Text("disclosures.solarRestrictions.description"),
        },
    ),
    (
        "Group14.Choice1",
        Rule::Yes("disclosures.parkingRestrictions.exists"),
    ),
    (
        "Group14.Choice2",
        Rule::No("disclosures.parkingRestrictions.exists"),
    ),
    (
        "Parking Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.parkingRestrictions.exists",
            rule: &Rule::Text("disclosures.parkingRestrictions.articleSection"),
        },
    ),
    (
        "Parking Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.parkingRestrictions.exists",
            rule: &Rule::Text("disclosures.parkingRestrictions.description"),
        },
    ),
    (
        "Group15.Choice1",
        Rule::Yes("disclosures.architecturalRestrictions.exists"),
    ),
    (
        "Group15.Choice2",
        Rule::No("disclosures.architecturalRestrictions.exists"),
    ),
    (
        "Architectural Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.architecturalRestrictions.exists",
            rule: &Rule::Text("disclosures.architecturalRestrictions.articleSection"),
        },
    ),
    (
        "Architectural Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.architecturalRestrictions.exists",
            rule: &Rule::Text("disclosures.architecturalRestrictions.description"),
        },
    ),
    (
        "Group16.Choice1",
        Rule::Yes("disclosures.businessUseRestrictions.exists"),
    ),
    (
        "Group16.Choice2",
        Rule::No("disclosures.businessUseRestrictions.exists"),
    ),
    (
        "Business Use Restrictions Article Section",
        Rule::ClearUnless {
            flag: "disclosures.businessUseRestrictions.exists",
            rule: &Rule::Text("disclosures.businessUseRestrictions.articleSection"),
        },
    ),
    (
        "Business Use Restrictions Description",
        Rule::ClearUnless {
            flag: "disclosures.businessUseRestrictions.exists",
            rule: &Rule::Text("disclosures.businessUseRestrictions.description"),
        },
    ),
    // Secondary mortgage market approvals
    (
        "Group17.Choice1",
        Rule::Yes("disclosures.mortgageApproval.hasApprovals"),
    ),
    (
        "Group17.Choice2",
        Rule::No("disclosures.mortgageApproval.hasApprovals"),
    ),
    // Governmental notices
    (
        "Group18.Choice1",
        Rule::Yes("disclosures.governmentNotices.exists"),
    ),
    (
        "Group18.Choice2",
        Rule::No("disclosures.governmentNotices.exists"),
    ),
    (
        "Government Notice Description",
        Rule::ClearUnless {
            flag: "disclosures.governmentNotices.exists",
            rule: &Rule::Text("disclosures.governmentNotices.description"),
        },
    ),
    // Stormwater facilities
    (
        "Group19.Choice1",
        Rule::Yes("disclosures.stormwater.hasFacilities"),
    ),
    (
        "Group19.Choice2",
        Rule::No("disclosures.stormwater.hasFacilities"),
    ),
    (
        "Stormwater Description",
        Rule::ClearUnless {
            flag: "disclosures.stormwater.hasFacilities",
            rule: &Rule::Text("disclosures.stormwater.description"),
        },
    ),
    // Pending common area conveyance
    (
        "Group21.Choice1",
        Rule::Yes("disclosures.commonAreaTransfer.pending"),
    ),
    (
        "Group21.Choice2",
        Rule::No("disclosures.commonAreaTransfer.pending"),
    ),
    (
        "Common Area Transfer Description",
        Rule::ClearUnless {
            flag: "disclosures.commonAreaTransfer.pending",
            rule: &Rule::Text("disclosures.commonAreaTransfer.description"),
        },
    ),
    // Governing documents
    (
        "Declaration Attached",
        Rule::Flag("disclosures.documents.declarationAttached"),
    ),
    (
        "Bylaws Attached",
        Rule::Flag("disclosures.documents.bylawsAttached"),
    ),
    (
        "Articles of Incorporation Attached",
        Rule::Flag("disclosures.documents.articlesAttached"),
    ),
    (
        "Rules and Regulations Attached",
        Rule::Flag("disclosures.documents.rulesAttached"),
    ),
    (
        "Architectural Guidelines Attached",
        Rule::Flag("disclosures.documents.architecturalGuidelinesAttached"),
    ),
    (
        "Meeting Minutes Attached",
        Rule::Flag("disclosures.documents.minutesAttached"),
    ),
];

/// Unpaid assessments plus late fees, plus other unpaid fees when they are disclosed.
fn total_amount_due(data: &ApplicationData, _ctx: &MapContext) -> Result<FieldValue, RuleFault> {
    let mut sources = vec![
        "disclosures.assessments.unpaidAmount",
        "disclosures.assessments.lateFees",
    ];
    if data.flag("disclosures.fees.hasOtherFees") {
        sources.push("disclosures.fees.unpaidFeesAmount");
    }

    let mut total = None;
    for path in sources {
        if let Some(value) = data.lookup(path) {
            if let Some(amount) = format::parse_amount(value)? {
                total = Some(total.unwrap_or(0.0) + amount);
            }
        }
    }

    Ok(FieldValue::Text(
        total.map(format::format_currency).unwrap_or_default(),
    ))
}
