//! Token records, redacted secrets, and validation policy.

pub mod record;
pub mod secret;
pub mod validation;
