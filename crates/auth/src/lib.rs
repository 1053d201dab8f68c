//! `seatwise-auth`: the Identity Gate and token verification.
//!
//! Decoupled from HTTP and storage: admin records are read through the
//! [`AdminDirectory`] boundary trait.

pub mod claims;
pub mod directory;
pub mod gate;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use directory::{AdminDirectory, AdminGrant, DirectoryError};
pub use gate::{AdminContext, AuthzError, IdentityGate};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use permissions::Permission;
pub use roles::Role;
