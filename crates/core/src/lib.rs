//! Pure domain logic for the Rewind export pipeline.
//!
//! No I/O and no database access live here. Data access goes through the
//! repository layer in `rewind_db`; HTTP concerns live in `rewind_api`.

pub mod channels;
pub mod error;
pub mod export_spec;
pub mod governor;
pub mod naming;
pub mod roles;
pub mod types;
