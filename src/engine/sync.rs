use crate::auth::{IdentityDirectory, ProvisionOutcome, resolve_flags};
use crate::core::error::Result;
use crate::core::value::FieldValue;
use crate::registry::EntityDescriptor;
use crate::store::Record;
use std::collections::BTreeSet;

/// What a profile save did to the identity directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The profile names no username; nothing to provision.
    Skipped,
    Provisioned {
        username: String,
        outcome: ProvisionOutcome,
    },
}

/// Provision the login account backing a profile: active, staff when any
/// role flag is set, superuser for admins, groups replaced to mirror the
/// flags. The caller logs failures instead of failing the profile save.
pub async fn sync_profile_identity(
    directory: &IdentityDirectory,
    descriptor: &EntityDescriptor,
    record: &Record,
    password: Option<&str>,
) -> Result<SyncOutcome> {
    let username = record
        .value(descriptor, "user")
        .and_then(FieldValue::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let Some(username) = username else {
        return Ok(SyncOutcome::Skipped);
    };

    let flags = resolve_flags(Some(record), descriptor, &BTreeSet::new());
    let outcome = directory
        .provision(
            username,
            password,
            flags.any(),
            flags.admin,
            flags.group_names(),
        )
        .await?;
    Ok(SyncOutcome::Provisioned {
        username: username.to_string(),
        outcome,
    })
}
