use crate::core::error::{EngineError, Result};
use crate::core::value::FieldValue;
use crate::registry::{EntityDescriptor, PermissionGroup};
use crate::store::Record;
use std::collections::BTreeSet;

/// Profile flag field -> capability group it mirrors.
const FLAG_GROUPS: &[(&str, &str)] = &[
    ("is_admin", "Admin"),
    ("is_master", "Master"),
    ("is_data_entry", "DataEntry"),
    ("is_reports", "Reports"),
    ("is_accounting", "Accounting"),
    ("is_recovery_agent", "RecoveryAgent"),
    ("is_auditor", "Auditor"),
    ("is_manager", "Manager"),
];

/// Normalized role booleans for one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub admin: bool,
    pub master: bool,
    pub data_entry: bool,
    pub reports: bool,
    pub accounting: bool,
    pub recovery_agent: bool,
    pub auditor: bool,
    pub manager: bool,
}

impl RoleFlags {
    pub fn any(&self) -> bool {
        self.admin
            || self.master
            || self.data_entry
            || self.reports
            || self.accounting
            || self.recovery_agent
            || self.auditor
            || self.manager
    }

    fn get(&self, field: &str) -> bool {
        match field {
            "is_admin" => self.admin,
            "is_master" => self.master,
            "is_data_entry" => self.data_entry,
            "is_reports" => self.reports,
            "is_accounting" => self.accounting,
            "is_recovery_agent" => self.recovery_agent,
            "is_auditor" => self.auditor,
            "is_manager" => self.manager,
            _ => false,
        }
    }

    fn set(&mut self, field: &str, value: bool) {
        match field {
            "is_admin" => self.admin = value,
            "is_master" => self.master = value,
            "is_data_entry" => self.data_entry = value,
            "is_reports" => self.reports = value,
            "is_accounting" => self.accounting = value,
            "is_recovery_agent" => self.recovery_agent = value,
            "is_auditor" => self.auditor = value,
            "is_manager" => self.manager = value,
            _ => {}
        }
    }

    /// The capability groups mirroring the set flags, for identity sync.
    pub fn group_names(&self) -> BTreeSet<String> {
        FLAG_GROUPS
            .iter()
            .filter(|(field, _)| self.get(field))
            .map(|(_, group)| group.to_string())
            .collect()
    }
}

/// Flags carried by capability-group membership alone, for identities
/// with no profile row to read.
pub fn flags_from_groups(groups: &BTreeSet<String>) -> RoleFlags {
    let mut flags = RoleFlags::default();
    for (field, group) in FLAG_GROUPS {
        if groups.contains(*group) {
            flags.set(field, true);
        }
    }
    flags
}

/// Resolve the flag set for an identity: for each flag, the profile's
/// declared boolean OR a truthy value under the same key in its extra
/// bag OR membership in the mirroring capability group. Sources never
/// override each other; any one being true wins.
pub fn resolve_flags(
    profile: Option<&Record>,
    descriptor: &EntityDescriptor,
    groups: &BTreeSet<String>,
) -> RoleFlags {
    let mut flags = flags_from_groups(groups);
    for (field, _) in FLAG_GROUPS {
        if flags.get(field) {
            continue;
        }
        let declared = profile
            .and_then(|record| record.value(descriptor, field))
            .map(FieldValue::is_truthy)
            .unwrap_or(false);
        let stashed = profile
            .and_then(|record| record.extra_data.get(*field))
            .map(FieldValue::is_truthy)
            .unwrap_or(false);
        flags.set(field, declared || stashed);
    }
    flags
}

/// Whether this identity may delete a record in the given logical group.
///
/// Checked in order: the super-administrator always may; an identity
/// with no profile and no flags may not; the master role is an explicit
/// deny ahead of every scoped allowance; admins may delete anything;
/// the scoped flags each unlock exactly one group.
pub fn authorize_delete(
    is_superuser: bool,
    has_profile: bool,
    flags: RoleFlags,
    target: PermissionGroup,
) -> Result<()> {
    if is_superuser {
        return Ok(());
    }
    if !has_profile && !flags.any() {
        return Err(EngineError::Forbidden(
            "No profile or role grants delete rights".into(),
        ));
    }
    if flags.master {
        return Err(EngineError::Forbidden(
            "The master role may not delete records".into(),
        ));
    }
    if flags.admin {
        return Ok(());
    }
    let allowed = match target {
        PermissionGroup::Reporting => flags.reports,
        PermissionGroup::Operational => flags.data_entry,
        PermissionGroup::Accounting => flags.accounting,
        PermissionGroup::General => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(EngineError::Forbidden(
            "You do not have permission to delete this record".into(),
        ))
    }
}
