//! Historical field names that older template revisions still use.

/// `(legacy, canonical)` pairs. Both names carry the same fact.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("Unpaid Fees.", "Unpaid Fees"),
    ("Date_Prepared", "Date Prepared"),
    ("Group_App3.Choice1", "Group3.Choice1"),
    ("Group_App3.Choice2", "Group3.Choice2"),
];

/// Canonical name for `name`, or `name` itself when it is not a legacy alias.
pub fn canonical(name: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// Every other name the same fact is known by, canonical first.
pub fn alternates(name: &str) -> Vec<&'static str> {
    let canonical = canonical(name);
    let mut names = Vec::new();

    if let Some((_, target)) = FIELD_ALIASES.iter().find(|(_, target)| *target == canonical) {
        if *target != name {
            names.push(*target);
        }
    }

    names.extend(
        FIELD_ALIASES
            .iter()
            .filter(|(legacy, target)| *target == canonical && *legacy != name)
            .map(|(legacy, _)| *legacy),
    );
    names
}
