//! `forumhub-auth`: token lifecycle, credential checks and role gating.
//!
//! This crate is intentionally decoupled from HTTP and storage: principals
//! are loaded through the [`PrincipalLookup`] seam and clocks are passed in.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use credentials::{AuthError, CredentialVerifier, HashingCost};
pub use jwt::{Hs256JwtCodec, JwtValidator, TokenIssueError, MIN_SECRET_LEN};
pub use principal::{normalize_identifier, validate_identifier, LookupError, Principal, PrincipalLookup};
pub use roles::Role;
