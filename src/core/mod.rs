// Core modules: raw store access, catalog, selection, transposition, validation, export.
pub mod catalog;
pub mod cell;
pub mod error;
pub mod export;
pub mod format;
pub mod pattern;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod summary;
pub mod transpose;
pub mod validate;
