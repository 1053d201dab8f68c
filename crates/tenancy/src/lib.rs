//! Tenancy domain module: tenants, roster members and the invite lifecycle.
//!
//! Pure, deterministic domain logic (no IO, no HTTP, no storage). Callers pass
//! `now` explicitly.

pub mod invite;
pub mod member;
pub mod tenant;

pub use invite::{InviteError, InviteToken, PendingInvite};
pub use member::{Member, MemberStatus, NewMember, normalize_contact};
pub use tenant::{Tenant, TenantStatus};
