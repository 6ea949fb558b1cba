//! # Parameter Expansion
//!
//! Pure derivation of concrete job documents from a batch template.
//!
//! A batch stores one template document and one override entry per sub-task.
//! Each entry is either a single [`OverrideSpec`] or a list of them; both are
//! normalized into an ordered `Vec<OverrideSpec>` before [`expand`] sees them.
//!
//! ```rust
//! use batcher_core::expansion::{expand, Document, OverrideSpec};
//! use serde_json::json;
//!
//! let template: Document = json!({"3": {"inputs": {"seed": 0}}})
//!     .as_object()
//!     .cloned()
//!     .unwrap_or_default();
//! let job = expand(&template, &[OverrideSpec::new("3", "seed", json!(42))]);
//! assert_eq!(job["3"]["inputs"]["seed"], json!(42));
//! assert_eq!(template["3"]["inputs"]["seed"], json!(0));
//! ```

pub mod expander;
pub mod overrides;

pub use expander::expand;
pub use overrides::{BatchConfig, Document, OverrideSpec, Overrides};
