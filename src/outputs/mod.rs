//! Output generation for collected postings.
//!
//! # Submodules
//!
//! - [`json`]: crash-safe `{"vagas": [...]}` files, one per category
//!
//! Remote publishing lives in [`crate::sync`].

pub mod json;
