//! Output adapters consuming the finished frame table.

pub mod bin;
pub mod csv;
pub mod text;
