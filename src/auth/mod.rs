//! Identity, sessions, role resolution and the login throttle.

pub mod identity;
pub mod roles;
pub mod session;
pub mod throttle;

pub use identity::{CAPABILITY_GROUPS, Identity, IdentityDirectory, ProvisionOutcome};
pub use roles::{RoleFlags, authorize_delete, flags_from_groups, resolve_flags};
pub use session::{Session, SessionStore};
pub use throttle::{
    AttemptState, Gate, LoginThrottle, MemoryThrottleStore, ThrottleKey, ThrottlePolicy,
    ThrottleStore, otp_matches,
};
