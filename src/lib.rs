//! # Neva
//!
//! > Modular Dependency Injection runtime for Rust: modules declare
//! > providers, controllers, imports and exports; the kernel flattens the
//! > import graph, enforces per-module visibility, resolves lazy singletons
//! > safely under concurrency and assembles an application handle.
//!
//! ## Features
//! * Modules with explicit imports and exports, encapsulated per hop
//! * Token-addressed providers, built lazily and memoized as singletons
//! * Eagerly built, uniquely named controllers for external adapters
//! * Exactly one in-flight build per token, shared by all waiters
//! * LIFO cleanup hooks with an externally supplied shutdown deadline
//! * Runs on stable Rust 1.90+
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use neva::{bootstrap, ControllerDef, ModuleDef, ModuleRef, ProviderDef};
//!
//! let database: ModuleRef = Arc::new(
//!     ModuleDef::new("database")
//!         .with_provider(ProviderDef::new("db.url", |_| Ok("postgres://localhost".to_string())))
//!         .with_export("db.url"),
//! );
//!
//! let root: ModuleRef = Arc::new(
//!     ModuleDef::new("app")
//!         .with_import(database)
//!         .with_controller(ControllerDef::new("Health", |r| {
//!             let url: String = r.resolve("db.url")?;
//!             Ok(format!("healthy: {url}"))
//!         })),
//! );
//!
//! let app = bootstrap(root).expect("bootstrap failed");
//! assert_eq!(*app.controller::<String>("Health").unwrap(), "healthy: postgres://localhost");
//! ```

pub mod app;
pub mod container;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod module;
pub mod visibility;

pub use crate::{
    app::{bootstrap, bootstrap_with, App},
    container::{Container, Resolver, RetryPolicy},
    error::{BoxError, Error},
    graph::Graph,
    lifecycle::{CleanupContext, CleanupError},
    module::{ControllerDef, Instance, Module, ModuleDef, ModuleRef, ProviderDef, Token},
};
