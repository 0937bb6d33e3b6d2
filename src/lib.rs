// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Deploy Manifest
//!
//! Polymorphic fields, per-environment overlays, and variable interpolation
//! for declarative deployment manifests.
//!
//! ## Overview
//!
//! A workload is described once in a `manifest.yml` and refined per
//! environment. Loading a manifest for an environment runs three stages:
//!
//! 1. **Interpolation**: `${NAME}` references in the raw text are replaced by
//!    predefined or externally supplied values
//! 2. **Decoding**: the YAML is decoded into typed records, with two-variant
//!    fields picking their form from the document's shape
//! 3. **Overlay**: the environment's sparse override is merged into the base
//!
//! ## Modules
//!
//! - [`union`]: Two-variant fields and shape-aware decoding
//! - [`overlay`]: Override merging with non-zero semantics
//! - [`interpolate`]: Variable substitution over raw manifest text
//! - [`manifest`]: Workload schema, loading, validation and hashing
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! name: frontend
//! type: Load Balanced Web Service
//! image:
//!   location: registry.example.com/${COPILOT_APPLICATION_NAME}/frontend:${TAG}
//!   port: 80
//! cpu: 256
//! memory: 512
//! count: 1
//! http:
//!   path: /
//!
//! environments:
//!   prod:
//!     cpu: 1024
//!     count:
//!       range: 2-10
//!       cpu_percentage: 70
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod error;
pub mod interpolate;
pub mod manifest;
pub mod overlay;
pub mod union;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use error::{ManifestError, Result};
pub use interpolate::{Interpolator, ProcessEnv, VariableSource};
pub use manifest::{Manifest, ManifestHasher, ManifestParser, ManifestValidator, WorkloadConfig};
pub use overlay::{Merge, resolve};
pub use union::{AOrB, IsZero, Union};
