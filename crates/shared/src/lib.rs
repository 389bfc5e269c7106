//! Types shared between the GeneBridge client core and the stub analysis service.

pub mod domain;
pub mod error;
pub mod protocol;
