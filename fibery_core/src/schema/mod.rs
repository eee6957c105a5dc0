//! Workspace schema: type/field descriptors, the name/id index, field
//! classification, the per-cycle cache and the picker option lists.

pub mod cache;
pub mod classify;
pub mod index;
pub mod models;
pub mod options;
