//! `seele-profile` — the long-term structured profile document (`seele.json`)
//! and its JSON-Patch (RFC 6902) mutation contract.

pub mod document;
pub mod error;
pub mod store;

pub use document::{default_template, MAX_MEMORABLE_EVENTS};
pub use error::{ProfileError, Result};
pub use store::ProfileStore;
