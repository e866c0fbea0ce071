//! Access-token verification for services that are not the auth service.
//!
//! The auth service signs RS256 access tokens and publishes its public keys
//! as a JWKS document. Every other service validates bearer tokens locally
//! against that document instead of calling back into auth on each request.
//! This crate carries the pieces both sides agree on: the claims layout, the
//! role enum, the tolerant `Authorization` header parser, the JWKS document
//! model, and a [`JwksVerifier`] that caches decoding keys by `kid`.

mod bearer;
mod claims;
mod jwks;
mod role;
mod verifier;

pub use bearer::extract_bearer;
pub use claims::AccessClaims;
pub use jwks::{JwksDocument, PublicJwk};
pub use role::Role;
pub use verifier::{JwksVerifier, VerifyError};
