pub mod descriptor;
pub mod roster;

pub use descriptor::{CodeSpec, EntityDescriptor, SoftDeleteMode};

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Logical cluster of entities used to scope role-flag delete authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionGroup {
    /// Client-facing data entry: clients, loan applications, recovery
    /// postings, joining forms.
    Operational,
    /// Vouchers, postings, account heads.
    Accounting,
    /// Field/weekly/monthly reports and report dropdowns.
    Reporting,
    General,
}

const OPERATIONAL_ENTITIES: &[&str] = &[
    "client",
    "loanapplication",
    "recoveryposting",
    "clientjoiningform",
    "clientjoining",
];

const ACCOUNTING_ENTITIES: &[&str] = &["voucher", "posting", "accounthead"];

const REPORTING_ENTITIES: &[&str] = &["fieldreport", "reportdropdownmenu", "reportdropdown"];

/// Pseudo-entities that must never reach generic CRUD; callers are pointed
/// at the dedicated permissions UI instead.
const FAUX_ENTITIES: &[&str] = &["userpermission", "userpermissions"];

/// Canonical form of an entity token: lowercased with spaces, underscores
/// and hyphens stripped. `Loan_Application`, `loan application` and
/// `loanapplication` all normalize to the same key.
pub fn normalize_entity(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Classify a canonical entity name into its logical permission group.
/// The reporting group additionally matches any name containing `report`,
/// an approximate classifier kept for parity with historical data.
pub fn group_for(name: &str) -> PermissionGroup {
    if OPERATIONAL_ENTITIES.contains(&name) {
        PermissionGroup::Operational
    } else if ACCOUNTING_ENTITIES.contains(&name) {
        PermissionGroup::Accounting
    } else if REPORTING_ENTITIES.contains(&name) || name.contains("report") {
        PermissionGroup::Reporting
    } else {
        PermissionGroup::General
    }
}

/// Outcome of resolving a request token against the registry.
#[derive(Debug)]
pub enum Resolution<'a> {
    Entity(&'a EntityDescriptor),
    /// Token belongs to the permissions pseudo-entity; the caller must
    /// branch to the dedicated UI.
    Faux,
    NotFound,
}

/// Closed registry of every record type the engine serves.
///
/// Descriptors are registered under canonical normalized names only;
/// resolution normalizes the incoming token and performs one exact lookup.
/// There is no substring or fuzzy fallback.
pub struct Registry {
    descriptors: Vec<EntityDescriptor>,
    by_name: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn build(descriptors: Vec<EntityDescriptor>) -> Self {
        let mut by_name = HashMap::with_capacity(descriptors.len());
        for (idx, desc) in descriptors.iter().enumerate() {
            debug_assert_eq!(
                desc.name,
                normalize_entity(desc.name),
                "descriptor '{}' must be registered under its normalized name",
                desc.name
            );
            let previous = by_name.insert(desc.name, idx);
            debug_assert!(previous.is_none(), "duplicate descriptor '{}'", desc.name);
        }
        Self {
            descriptors,
            by_name,
        }
    }

    pub fn resolve(&self, token: &str) -> Resolution<'_> {
        let normalized = normalize_entity(token);
        if FAUX_ENTITIES.contains(&normalized.as_str()) {
            return Resolution::Faux;
        }
        match self.by_name.get(normalized.as_str()) {
            Some(&idx) => Resolution::Entity(&self.descriptors[idx]),
            None => Resolution::NotFound,
        }
    }

    /// Direct lookup by canonical name, bypassing the faux check. Used by
    /// internal callers (the permissions UI, store provisioning).
    pub fn get(&self, canonical: &str) -> Option<&EntityDescriptor> {
        self.by_name
            .get(canonical)
            .map(|&idx| &self.descriptors[idx])
    }

    pub fn descriptors(&self) -> &[EntityDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

lazy_static! {
    /// The process-wide registry. Built once from the roster; read-only
    /// afterwards.
    pub static ref REGISTRY: Registry = Registry::build(roster::all_descriptors());
}
