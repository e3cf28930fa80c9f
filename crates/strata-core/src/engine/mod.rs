//! The probabilistic inference engine.
//!
//! This module provides:
//! - **errors**: Configuration and fusion error types
//! - **factor**: Discrete factor algebra
//! - **network**: Two-slice network template with validated CPTs
//! - **evidence**: Evidence and posterior value types
//! - **elimination**: Exact variable elimination and a brute-force reference
//! - **filtering**: One-step forward filtering across time slices
//! - **learning**: Root prior estimation from observation records

pub mod elimination;
pub mod errors;
pub mod evidence;
pub mod factor;
pub mod filtering;
pub mod learning;
pub mod network;
