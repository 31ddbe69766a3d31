use crate::core::field::{FieldDef, FieldRole};
use crate::registry::PermissionGroup;

/// Auto-code settings for a record type: which field holds the code and
/// the prefix used when generating one (`STF` + zero-padded sequence).
#[derive(Debug, Clone, Copy)]
pub struct CodeSpec {
    pub field: &'static str,
    pub prefix: &'static str,
    pub width: usize,
}

/// How "delete" manifests for a record type, decided by field presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftDeleteMode {
    /// Has a `status` field: flip it to "inactive".
    Status,
    /// No status but carries `extra_data`: set `deleted = true` inside it.
    ExtraFlag,
    /// Neither: remove the row.
    Hard,
}

/// Registry entry for one record type: its declared fields, logical
/// permission group, auto-code settings and unstructured-bag capabilities.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub pretty: &'static str,
    pub fields: Vec<FieldDef>,
    pub group: PermissionGroup,
    pub code: Option<CodeSpec>,
    pub has_extra_data: bool,
    pub has_raw_csv: bool,
}

impl EntityDescriptor {
    pub fn new(name: &'static str, pretty: &'static str) -> Self {
        Self {
            name,
            pretty,
            fields: Vec::new(),
            group: crate::registry::group_for(name),
            code: None,
            has_extra_data: true,
            has_raw_csv: false,
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_code(mut self, field: &'static str, prefix: &'static str) -> Self {
        self.code = Some(CodeSpec {
            field,
            prefix,
            width: 3,
        });
        self
    }

    pub fn raw_csv(mut self) -> Self {
        self.has_raw_csv = true;
        self
    }

    pub fn no_extra_data(mut self) -> Self {
        self.has_extra_data = false;
        self
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    pub fn status_index(&self) -> Option<usize> {
        self.field_index("status")
    }

    pub fn code_field_index(&self) -> Option<usize> {
        self.code.and_then(|spec| self.field_index(spec.field))
    }

    /// Policy precedence: status beats the extra-data flag, which beats
    /// hard deletion.
    pub fn soft_delete_mode(&self) -> SoftDeleteMode {
        if self.status_index().is_some() {
            SoftDeleteMode::Status
        } else if self.has_extra_data {
            SoftDeleteMode::ExtraFlag
        } else {
            SoftDeleteMode::Hard
        }
    }

    /// Fields that never show on a form and never accept user input
    /// directly (passwords are captured separately for identity sync).
    pub fn password_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.role == FieldRole::Password)
    }
}
