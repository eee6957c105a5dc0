//! Query building: select expansion over the schema and assembly of the full
//! entity query object (`q/from`, `q/select`, `q/limit`, ordering and filter).

pub mod assemble;
pub mod models;
pub mod select;

pub use assemble::assemble;
pub use select::expand;
