//! Auth-domain identifiers, role sets, and token models.

pub mod id;
pub mod role;
pub mod token;

pub use id::*;
pub use role::*;
pub use token::{claims::*, credential::*, record::*, secret::*};
