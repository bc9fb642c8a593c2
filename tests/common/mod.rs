//! Common test utilities for the handshake integration tests.
//!
//! Provides a mock Vault whose AWS login endpoint checks the identity proof
//! the way the real auth method does: decode the payload, compare the
//! anti-relay header and verify the SigV4 signature.

#![allow(dead_code)]

pub mod mock_vault;
