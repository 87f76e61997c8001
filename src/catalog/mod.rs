//! Catalog: the process-wide set of loaded databases

mod registry;

pub use registry::Registry;
