use crate::core::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive kind of a declared field. Dynamic columns use the same four
/// kinds (their `file` type is carried as text holding the file name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Date,
}

impl FieldKind {
    pub fn is_compatible(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (_, FieldValue::Null) => true,
            (Self::Text, FieldValue::Text(_)) => true,
            (Self::Number, FieldValue::Number(_)) => true,
            (Self::Bool, FieldValue::Bool(_)) => true,
            (Self::Date, FieldValue::Date(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Bool => write!(f, "bool"),
            Self::Date => write!(f, "date"),
        }
    }
}

/// Extra semantics attached to a field beyond its primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Plain,
    /// Identifying code: auto-generated when blank, read-only once set.
    Code,
    /// Exactly ten digits.
    Phone,
    /// Twelve digits in the grouped `0000 0000 0000` form.
    Aadhaar,
    /// Status-like field: hidden on forms, forced to its default.
    Status,
    /// Write-only: captured for identity sync, never stored on the record.
    Password,
}

/// Referential action applied to rows pointing at a deleted parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Restrict,
    SetNull,
}

#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub entity: &'static str,
    pub on_delete: OnDelete,
}

/// Declared field of a record type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub role: FieldRole,
    pub required: bool,
    pub unique: bool,
    pub hidden: bool,
    pub choices: Option<&'static [&'static str]>,
    pub default: Option<&'static str>,
    pub reference: Option<Reference>,
}

pub const STATUS_CHOICES: &[&str] = &["active", "inactive", "pending", "blocked"];

impl FieldDef {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            role: FieldRole::Plain,
            required: false,
            unique: false,
            hidden: false,
            choices: None,
            default: None,
            reference: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.role = FieldRole::Code;
        self.unique = true;
        self
    }

    pub fn phone(mut self) -> Self {
        self.role = FieldRole::Phone;
        self
    }

    pub fn aadhaar(mut self) -> Self {
        self.role = FieldRole::Aadhaar;
        self
    }

    pub fn password(mut self) -> Self {
        self.role = FieldRole::Password;
        self.hidden = true;
        self
    }

    pub fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub fn references(mut self, entity: &'static str) -> Self {
        self.reference = Some(Reference {
            entity,
            on_delete: OnDelete::SetNull,
        });
        self
    }

    pub fn references_restrict(mut self, entity: &'static str) -> Self {
        self.reference = Some(Reference {
            entity,
            on_delete: OnDelete::Restrict,
        });
        self
    }

    /// Status-like fields are hidden from users and backfilled with an
    /// active default: `status`, `is_active`, `active`.
    pub fn is_status_like(&self) -> bool {
        self.role == FieldRole::Status
            || matches!(self.name, "status" | "is_active" | "active")
    }

    /// Human label derived from the field name (`joining_date` ->
    /// `Joining date`).
    pub fn label(&self) -> String {
        let spaced = self.name.replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => spaced,
        }
    }
}

pub fn text(name: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Text)
}

pub fn number(name: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Number)
}

pub fn boolean(name: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Bool)
}

pub fn date(name: &'static str) -> FieldDef {
    FieldDef::new(name, FieldKind::Date)
}

/// The standard `status` field carried by most business entities.
pub fn status_field() -> FieldDef {
    let mut f = text("status")
        .choices(STATUS_CHOICES)
        .default_value("active")
        .hidden();
    f.role = FieldRole::Status;
    f
}
