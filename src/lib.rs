//! Purpose: Library behind the `tabex` CLI: catalog, validate, and export legacy database tables.
//! Exports: `api` (stable surface), `core` (engine), `config`, `notice`, `schemas`.
//! Role: Everything the binary does is reachable from here for embedding and tests.
//! Invariants: The database handle is the only owner of an open raw store.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod config;
pub mod core;
pub mod notice;
pub mod schemas;
