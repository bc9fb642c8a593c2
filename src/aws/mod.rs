//! AWS request signing and credential resolution.
//!
//! Only what the identity proof needs: static or SDK-resolved credentials
//! and Signature Version 4 over a single buffered request.

pub mod credentials;
pub mod sigv4;

pub use credentials::{AwsCredentials, CredentialsProvider, DefaultChainCredentials, StaticCredentials};
