//! The back-office engine: one facade over the registry, store, forms,
//! identity directory and feature endpoints. HTTP handlers call into
//! this and translate outcomes into envelopes; everything stateful
//! lives here.

pub mod codes;
pub mod delete;
pub mod sync;

pub use delete::{DeleteOutcome, MIGRATION_NOTE};
pub use sync::SyncOutcome;

use crate::auth::{
    Identity, IdentityDirectory, LoginThrottle, RoleFlags, SessionStore, ThrottleKey,
    authorize_delete, flags_from_groups, otp_matches, resolve_flags,
};
use crate::columns::columns_for;
use crate::config::AppConfig;
use crate::core::error::{EngineError, Result};
use crate::core::value::FieldValue;
use crate::features::bureau::{self, BureauReport, BureauRequest};
use crate::features::npa::{self, NpaSummary};
use crate::forms::{FragmentCache, build_form, render_form, validate_submission};
use crate::registry::{EntityDescriptor, REGISTRY, Registry, Resolution};
use crate::store::Store;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

type JsonMap = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Request / response shapes
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub active_only: bool,
    pub hide_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ListPage {
    pub entity: &'static str,
    pub pretty: &'static str,
    pub records: Vec<serde_json::Value>,
    pub column_fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormPayload {
    pub entity: &'static str,
    pub mode: &'static str,
    pub html: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedRecord {
    pub id: u64,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: String,
    pub username: String,
    pub redirect: String,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(LoginSuccess),
    /// Step-up engaged; the caller must resubmit with a one-time code.
    OtpRequired,
}

// ============================================================================
// Engine
// ============================================================================

pub struct BackOffice {
    store: Store,
    identities: IdentityDirectory,
    sessions: SessionStore,
    throttle: LoginThrottle,
    fragments: FragmentCache,
    config: AppConfig,
}

impl std::fmt::Debug for BackOffice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackOffice")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackOffice {
    /// Provision tables, create the bootstrap administrator and load the
    /// snapshot when one is configured and present.
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        config.validate().map_err(EngineError::Unexpected)?;

        let store = Store::provision(&REGISTRY, &config.skip_tables);
        let identities = IdentityDirectory::new();
        identities
            .bootstrap_admin(&config.admin_username, &config.admin_password)
            .await?;
        let sessions = SessionStore::with_lifetimes(
            Duration::days(config.session_remember_days),
            Duration::hours(config.session_hours),
        );
        let throttle = LoginThrottle::in_memory(config.throttle);
        let fragments = FragmentCache::new(config.fragment_cache_size);

        if let Some(path) = &config.snapshot_path {
            if path.exists() {
                let restored = store.load_snapshot(path).await?;
                tracing::info!(tables = restored, path = %path.display(), "snapshot loaded");
            }
        }

        Ok(Self {
            store,
            identities,
            sessions,
            throttle,
            fragments,
            config,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn identities(&self) -> &IdentityDirectory {
        &self.identities
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolve a request token to its descriptor. Faux permission tokens
    /// never reach generic CRUD.
    fn descriptor(token: &str) -> Result<&'static EntityDescriptor> {
        let registry: &'static Registry = &REGISTRY;
        match registry.resolve(token) {
            Resolution::Entity(descriptor) => Ok(descriptor),
            Resolution::Faux => Err(EngineError::Forbidden(
                "Permissions are managed on the dedicated permission screen".into(),
            )),
            Resolution::NotFound => Err(EngineError::EntityNotFound(token.to_string())),
        }
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    pub async fn login(&self, client: &str, request: &LoginRequest) -> Result<LoginOutcome> {
        let key = ThrottleKey::new(client, &request.username);
        let now = Utc::now();
        let gate = self.throttle.check(&key, now).await?;
        if gate.otp_required && !otp_matches(request.otp.as_deref().unwrap_or("")) {
            tracing::info!(username = %request.username, "one-time code demanded");
            return Ok(LoginOutcome::OtpRequired);
        }

        let identity = match self
            .identities
            .authenticate(&request.username, &request.password)
            .await
        {
            Ok(identity) => identity,
            Err(err) => {
                self.throttle.record_failure(&key, now).await;
                return Err(err);
            }
        };

        self.throttle.record_success(&key).await;
        self.identities.record_login(identity.username()).await;
        let session = self.sessions.open(identity.username(), request.remember).await;
        tracing::info!(username = %identity.username(), remember = request.remember, "login");
        Ok(LoginOutcome::Success(LoginSuccess {
            token: session.token,
            username: identity.username().to_string(),
            redirect: "/dashboard/".to_string(),
        }))
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token).await
    }

    /// Drop the current session, then authenticate the new credentials
    /// through the ordinary login path (throttle included).
    pub async fn switch_account(
        &self,
        client: &str,
        current_token: Option<&str>,
        request: &LoginRequest,
    ) -> Result<LoginOutcome> {
        if let Some(token) = current_token {
            self.sessions.revoke(token).await;
        }
        self.login(client, request).await
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<Identity> {
        let username = self.sessions.resolve(token).await?;
        self.identities.get(&username).await.ok_or_else(|| {
            EngineError::Unauthorized("Session user no longer exists".into())
        })
    }

    /// The delete-rights inputs for an identity: whether a profile row
    /// exists and the resolved flag set.
    pub async fn roles_for(&self, identity: &Identity) -> (bool, RoleFlags) {
        let Some(descriptor) = REGISTRY.get("userprofile") else {
            return (false, flags_from_groups(&identity.groups));
        };
        let Ok(table) = self.store.table("userprofile") else {
            return (false, flags_from_groups(&identity.groups));
        };
        let guard = table.read().await;
        let profile = guard.rows().find(|row| {
            row.value(descriptor, "user")
                .and_then(FieldValue::as_str)
                .map(str::trim)
                == Some(identity.username())
        });
        let flags = resolve_flags(profile, descriptor, &identity.groups);
        (profile.is_some(), flags)
    }

    // ------------------------------------------------------------------------
    // Generic CRUD
    // ------------------------------------------------------------------------

    pub async fn list(&self, entity: &str, filter: ListFilter) -> Result<ListPage> {
        let descriptor = Self::descriptor(entity)?;
        let columns = columns_for(&self.store, descriptor.name).await;
        let table = self.store.table(descriptor.name)?;
        let guard = table.read().await;

        let mut records = Vec::new();
        for row in guard.rows() {
            if filter.active_only && !row.is_active(descriptor) {
                continue;
            }
            if filter.hide_deleted && row.is_deleted_flagged() {
                continue;
            }
            records.push(row.to_json(descriptor));
        }
        Ok(ListPage {
            entity: descriptor.name,
            pretty: descriptor.pretty,
            records,
            column_fields: columns.fields.iter().map(|c| c.field_name.clone()).collect(),
        })
    }

    async fn code_preview(&self, descriptor: &EntityDescriptor) -> Result<Option<String>> {
        let Some(spec) = descriptor.code else {
            return Ok(None);
        };
        let table = self.store.table(descriptor.name)?;
        let guard = table.read().await;
        Ok(Some(codes::format_code(
            &spec,
            guard.next_code_number(descriptor),
        )))
    }

    /// Preview the code the next create would assign.
    pub async fn next_code(&self, entity: &str) -> Result<String> {
        let descriptor = Self::descriptor(entity)?;
        match self.code_preview(descriptor).await? {
            Some(code) => Ok(code),
            None => Err(EngineError::invalid(
                "entity",
                "This entity has no auto-generated code.",
            )),
        }
    }

    /// Render a create or edit form fragment. Unbound create forms are
    /// served from the fragment cache when nothing they depend on moved.
    pub async fn form(&self, entity: &str, id: Option<u64>) -> Result<FormPayload> {
        let descriptor = Self::descriptor(entity)?;
        let columns = columns_for(&self.store, descriptor.name).await;

        match id {
            Some(id) => {
                let table = self.store.table(descriptor.name)?;
                let guard = table.read().await;
                let record = guard
                    .get(id)
                    .ok_or_else(|| EngineError::record_not_found(descriptor.name, id))?;
                let form = build_form(descriptor, &columns, Some(record), None);
                Ok(FormPayload {
                    entity: descriptor.name,
                    mode: "edit",
                    html: render_form(&form),
                    warning: columns.warning,
                })
            }
            None => {
                let preview = self.code_preview(descriptor).await?;
                if let Some(html) = self.fragments.get(descriptor.name, preview.as_deref()).await {
                    return Ok(FormPayload {
                        entity: descriptor.name,
                        mode: "create",
                        html,
                        warning: columns.warning,
                    });
                }
                let form = build_form(descriptor, &columns, None, preview.as_deref());
                let html = render_form(&form);
                self.fragments
                    .put(descriptor.name, preview.as_deref(), html.clone())
                    .await;
                Ok(FormPayload {
                    entity: descriptor.name,
                    mode: "create",
                    html,
                    warning: columns.warning,
                })
            }
        }
    }

    pub async fn create(&self, entity: &str, payload: &JsonMap) -> Result<CreatedRecord> {
        let descriptor = Self::descriptor(entity)?;
        let columns = columns_for(&self.store, descriptor.name).await;
        let submission =
            validate_submission(descriptor, &columns, payload, None, &self.store).await?;
        let mut values = submission.values;
        if descriptor.name == "userprofile" {
            self.prepare_profile(descriptor, &mut values, true).await;
        }

        let table = self.store.table(descriptor.name)?;
        let (id, assigned_code, record) = {
            let mut guard = table.write().await;
            // validation ran under a read lock; re-check before writing
            if let Some((name, _)) = guard.find_unique_collision(descriptor, &values, None) {
                return Err(Self::collision_error(descriptor, name));
            }
            let mut assigned_code = None;
            if let (Some(spec), Some(idx)) = (descriptor.code, descriptor.code_field_index()) {
                let blank = values
                    .get(idx)
                    .map(|v| v.is_null() || v.as_str().map(|s| s.trim().is_empty()).unwrap_or(false))
                    .unwrap_or(true);
                if blank {
                    let code = codes::format_code(&spec, guard.next_code_number(descriptor));
                    values[idx] = FieldValue::Text(code.clone());
                    assigned_code = Some(code);
                } else {
                    assigned_code = values[idx].as_str().map(str::to_string);
                }
            }
            let id = guard.insert(values, submission.extra);
            (id, assigned_code, guard.get(id).cloned())
        };

        if descriptor.name == "column" {
            self.fragments.bump_columns_epoch();
        }
        if descriptor.name == "userprofile" {
            if let Some(record) = &record {
                self.run_profile_sync(descriptor, id, record, submission.password.as_deref())
                    .await;
            }
        }
        tracing::info!(entity = descriptor.name, id, "record created");
        Ok(CreatedRecord {
            id,
            code: assigned_code,
        })
    }

    pub async fn update(&self, entity: &str, id: u64, payload: &JsonMap) -> Result<()> {
        let descriptor = Self::descriptor(entity)?;
        let columns = columns_for(&self.store, descriptor.name).await;
        let instance = {
            let table = self.store.table(descriptor.name)?;
            let guard = table.read().await;
            guard
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::record_not_found(descriptor.name, id))?
        };
        let submission =
            validate_submission(descriptor, &columns, payload, Some(&instance), &self.store)
                .await?;
        let mut values = submission.values;
        if descriptor.name == "userprofile" {
            self.prepare_profile(descriptor, &mut values, false).await;
        }

        let record = {
            let table = self.store.table(descriptor.name)?;
            let mut guard = table.write().await;
            if let Some((name, _)) = guard.find_unique_collision(descriptor, &values, Some(id)) {
                return Err(Self::collision_error(descriptor, name));
            }
            let Some(row) = guard.get_mut(id) else {
                return Err(EngineError::record_not_found(descriptor.name, id));
            };
            row.values = values;
            for (key, value) in submission.extra {
                row.extra_data.insert(key, value);
            }
            row.clone()
        };

        if descriptor.name == "column" {
            self.fragments.bump_columns_epoch();
        }
        if descriptor.name == "userprofile" {
            self.run_profile_sync(descriptor, id, &record, submission.password.as_deref())
                .await;
        }
        tracing::info!(entity = descriptor.name, id, "record updated");
        Ok(())
    }

    pub async fn delete(
        &self,
        entity: &str,
        id: u64,
        identity: &Identity,
    ) -> Result<DeleteOutcome> {
        let descriptor = Self::descriptor(entity)?;
        let (has_profile, flags) = self.roles_for(identity).await;
        authorize_delete(identity.is_superuser, has_profile, flags, descriptor.group)?;

        let outcome = delete::execute(&self.store, descriptor, id).await?;
        if descriptor.name == "column" && outcome == DeleteOutcome::HardDeleted {
            self.fragments.bump_columns_epoch();
        }
        tracing::info!(entity = descriptor.name, id, outcome = ?outcome, "delete resolved");
        Ok(outcome)
    }

    fn collision_error(descriptor: &EntityDescriptor, field: &str) -> EngineError {
        let label = descriptor
            .field(field)
            .map(|f| f.label().to_lowercase())
            .unwrap_or_else(|| field.to_string());
        EngineError::invalid(
            field,
            &format!("A record with this {} already exists.", label),
        )
    }

    /// Profile fixups applied before the row is written: every new
    /// profile starts with reports access, and a missing branch falls
    /// back to the linked staff member's branch.
    async fn prepare_profile(
        &self,
        descriptor: &EntityDescriptor,
        values: &mut [FieldValue],
        is_create: bool,
    ) {
        if is_create {
            if let Some(idx) = descriptor.field_index("is_reports") {
                values[idx] = FieldValue::Bool(true);
            }
        }

        let branch_idx = match descriptor.field_index("branch") {
            Some(idx) if values[idx].is_null() => idx,
            _ => return,
        };
        let staff_id = descriptor
            .field_index("staff")
            .and_then(|idx| values[idx].as_f64())
            .map(|n| n as u64);
        let Some(staff_id) = staff_id else { return };
        let (Some(staff_desc), Ok(staff_table)) =
            (REGISTRY.get("staff"), self.store.table("staff"))
        else {
            return;
        };
        let guard = staff_table.read().await;
        let branch = guard
            .get(staff_id)
            .and_then(|row| row.value(staff_desc, "branch"))
            .filter(|value| !value.is_null())
            .cloned();
        if let Some(branch) = branch {
            values[branch_idx] = branch;
        }
    }

    /// Best-effort identity sync after a profile save. Failures are
    /// logged; the saved profile is never rolled back.
    async fn run_profile_sync(
        &self,
        descriptor: &EntityDescriptor,
        id: u64,
        record: &crate::store::Record,
        password: Option<&str>,
    ) {
        match sync::sync_profile_identity(&self.identities, descriptor, record, password).await {
            Ok(SyncOutcome::Provisioned { username, outcome }) => {
                tracing::info!(%username, outcome = ?outcome, "profile identity synced");
                if let Ok(table) = self.store.table(descriptor.name) {
                    let mut guard = table.write().await;
                    if let Some(row) = guard.get_mut(id) {
                        row.extra_data
                            .insert("auth_username".to_string(), FieldValue::Text(username));
                    }
                }
            }
            Ok(SyncOutcome::Skipped) => {}
            Err(err) => {
                tracing::warn!(error = %err, profile = id, "identity sync failed; profile saved");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Feature endpoints
    // ------------------------------------------------------------------------

    /// Clients whose Aadhaar starts with the space-stripped query, capped
    /// at ten hits.
    pub async fn search_clients_by_aadhaar(&self, query: &str) -> Result<Vec<serde_json::Value>> {
        let descriptor = Self::descriptor("client")?;
        let needle: String = query.chars().filter(|c| !c.is_whitespace()).collect();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.store.table(descriptor.name)?;
        let guard = table.read().await;
        let mut hits = Vec::new();
        for row in guard.rows() {
            let Some(aadhar) = row.value(descriptor, "aadhar").and_then(FieldValue::as_str)
            else {
                continue;
            };
            let compact: String = aadhar.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.starts_with(&needle) {
                let name = row
                    .value(descriptor, "name")
                    .and_then(FieldValue::as_str)
                    .unwrap_or("");
                hits.push(json!({ "id": row.id, "name": name, "aadhar": aadhar }));
                if hits.len() == 10 {
                    break;
                }
            }
        }
        Ok(hits)
    }

    /// Capability groups with their member usernames.
    pub async fn permission_groups(&self) -> std::collections::BTreeMap<String, Vec<String>> {
        self.identities.group_members().await
    }

    pub async fn bureau_pull(&self, request: &BureauRequest) -> BureauReport {
        bureau::pull(&self.config, request).await
    }

    pub async fn npa_summary(&self) -> Result<NpaSummary> {
        if !self.config.npa_enabled {
            return Ok(NpaSummary::disabled());
        }
        npa::summarize(&self.store).await
    }

    pub async fn save_snapshot(&self) -> Result<()> {
        let Some(path) = &self.config.snapshot_path else {
            return Err(EngineError::Snapshot("No snapshot path configured".into()));
        };
        self.store.save_snapshot(path).await
    }
}
