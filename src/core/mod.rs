pub mod error;
pub mod field;
pub mod value;

pub use error::{EngineError, FieldErrors, Result};
pub use field::{FieldDef, FieldKind, FieldRole, OnDelete, Reference, STATUS_CHOICES};
pub use value::FieldValue;
