//! Data layer: core types, loading, typing, filtering, and editing.
//!
//! Architecture:
//! ```text
//!   .csv bytes (BOM tolerated)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse bytes → Dataset / serialize Dataset → bytes
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Dataset  │  columns of typed cells, immutable once built
//!   └──────────┘
//!     │      │      │
//!     ▼      ▼      ▼
//!  ┌───────┐ ┌───────┐ ┌──────┐
//!  │ schema │ │ filter │ │ edit  │
//!  └───────┘ └───────┘ └──────┘
//!   kinds     row view   new Dataset
//! ```

pub mod edit;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
