//! Data layer: core types, loading, and label bookkeeping.
//!
//! Architecture:
//! ```text
//!  .dat (2/4 col) / .json / .csv / .parquet        rate table
//!        │                                             │
//!        ▼                                             ▼
//!   ┌──────────┐                                 ┌──────────┐
//!   │  loader   │  parse file → Spectrum          │  loader   │  → RateTable
//!   └──────────┘                                 └──────────┘
//!
//!  truth table + index files ──► labels ──► verbatim label columns
//! ```

pub mod labels;
pub mod loader;
pub mod model;
