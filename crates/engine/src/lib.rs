//! # Fanout Engine
//!
//! The Fanout Engine backs a single GraphQL field with more than one upstream
//! source. At query time a selector picks one or more named targets, the
//! engine calls them concurrently, checks that their answers agree in shape,
//! and reconciles them into one value matching the field's declared type.
//!
//! ## Pipeline
//!
//! - **Target Registry** (`registry`): selector to ordered target list; unknown
//!   names fail before any call is issued
//! - **Dispatcher** (`dispatch`): one call per target, concurrent,
//!   all-or-nothing, bounded by one deadline and one cancellation token
//! - **Compatibility Validator** (`validate`): payloads classified as absent,
//!   collection or single; non-absent payloads must agree
//! - **Merge Engine** (`merge`): collection dedupe with latest-wins, composite
//!   deep-merge, scalar first-wins
//!
//! A field resolved against exactly one target returns that target's payload
//! untouched, and its failure surfaces unwrapped.
//!
//! ## Usage
//!
//! ```rust
//! use fanout_engine::{ExecutionContext, FieldSource, TargetRegistry, caller_fn};
//! use fanout_types::{DeclaredShape, MergePolicy, Target};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let registry = TargetRegistry::new([
//!     Target::new("primary", "https://primary.example.com"),
//!     Target::new("replica", "https://replica.example.com"),
//! ])?;
//! let users = FieldSource::new("users", registry, DeclaredShape::Collection, MergePolicy::default());
//!
//! let caller = caller_fn(|target: Target, _| async move { Ok(json!([{ "id": 1, "seen_by": target.name }])) });
//! let merged = users
//!     .resolve(Some(&json!(["primary", "replica"])), &ExecutionContext::new(), &caller)
//!     .await?;
//! assert_eq!(merged, json!([{ "id": 1, "seen_by": "replica" }]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! # fn tokio_test_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(future)
//! # }
//! ```

pub mod catalog;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod http;
pub mod merge;
pub mod registry;
pub mod validate;

pub use catalog::FieldCatalog;
pub use context::ExecutionContext;
pub use dispatch::{FnCaller, TargetCaller, caller_fn, dispatch};
pub use error::{CallError, DispatchError, FanoutError, FieldError, IncompatibilityError, RegistryError, ShapeMismatchError, UnknownTargetError};
pub use field::FieldSource;
pub use http::HttpTargetCaller;
pub use merge::merge;
pub use registry::TargetRegistry;
pub use validate::{check_compatible, check_declared_shape, validate};
