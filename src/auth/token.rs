//! Access credentials, refresh-token records, and the secrets they carry.

pub mod claims;
pub mod credential;
pub mod record;
pub mod secret;
