//! Application bootstrap and handle

use indexmap::IndexMap;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc
};

use crate::{
    container::{Container, Resolver, RetryPolicy},
    error::Error,
    graph::{self, Graph},
    lifecycle::{CleanupContext, CleanupError},
    module::{Instance, ModuleRef, Token},
    visibility::Visibility
};

/// A bootstrapped application: the flattened module graph, the lazy
/// singleton container and the eagerly built controllers
///
/// Once bootstrapped, the handle is safe to share across threads; the graph
/// and visibility table are immutable and resolution goes through the
/// container's per-token build protocol.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use neva::{bootstrap, ControllerDef, ModuleDef, ModuleRef, ProviderDef};
///
/// let database: ModuleRef = Arc::new(
///     ModuleDef::new("database")
///         .with_provider(ProviderDef::new("db.url", |_| Ok("postgres://localhost".to_string())))
///         .with_export("db.url"),
/// );
///
/// let root: ModuleRef = Arc::new(
///     ModuleDef::new("app")
///         .with_import(database)
///         .with_controller(ControllerDef::new("Health", |r| {
///             let url: String = r.resolve("db.url")?;
///             Ok(format!("healthy: {url}"))
///         })),
/// );
///
/// let app = bootstrap(root).expect("bootstrap failed");
/// assert!(app.controller::<String>("Health").is_some());
/// ```
pub struct App {
    graph: Graph,
    container: Container,
    controllers: IndexMap<String, Instance>,
}

/// Bootstraps an application from its root module with the default
/// [`RetryPolicy`]
///
/// Builds the import graph, computes per-module visibility, constructs the
/// container over every provider in the graph and eagerly builds all
/// controllers in graph discovery order. Providers stay lazy: a
/// misconfigured provider that no controller references does not fail
/// bootstrap; its error surfaces on the first resolution of its token.
pub fn bootstrap(root: ModuleRef) -> Result<App, Error> {
    bootstrap_with(root, RetryPolicy::default())
}

/// Bootstraps an application with an explicit [`RetryPolicy`] for failed
/// provider builds
pub fn bootstrap_with(root: ModuleRef, retry: RetryPolicy) -> Result<App, Error> {
    let graph = graph::build(&root)?;
    let visibility = Visibility::compute(&graph)?;
    let container = Container::new(&graph, visibility, retry)?;

    let mut controllers: IndexMap<String, Instance> = IndexMap::new();
    for node in graph.modules() {
        let resolver = container.resolver_for(node.name.as_str());
        for controller in &node.def.controllers {
            if controllers.contains_key(controller.name()) {
                return Err(Error::DuplicateControllerName {
                    name: controller.name().to_string(),
                });
            }
            let instance = (controller.build)(&resolver).map_err(|cause| Error::ControllerBuild {
                module: node.name.clone(),
                controller: controller.name().to_string(),
                cause: cause.into(),
            })?;
            controllers.insert(controller.name().to_string(), instance);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        "application bootstrapped: {} module(s), {} controller(s)",
        graph.modules().len(),
        controllers.len()
    );

    Ok(App { graph, container, controllers })
}

impl App {
    /// Returns a resolver scoped to the root module's visibility
    pub fn resolver(&self) -> Resolver {
        self.container.resolver_for(self.graph.root())
    }

    /// Resolves a token against the root module's scope
    pub fn get(&self, token: impl Into<Token>) -> Result<Instance, Error> {
        self.resolver().get(token)
    }

    /// Resolves a token against the root scope and returns a cloned `T`
    pub fn resolve<T: Clone + Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<T, Error> {
        self.resolver().resolve(token)
    }

    /// Resolves a token against the root scope and returns a shared `T`
    pub fn resolve_shared<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Arc<T>, Error> {
        self.resolver().resolve_shared(token)
    }

    /// Returns the flattened module graph
    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the built controllers keyed by unique name, in build order,
    /// for an external adapter (e.g. an HTTP router) to consume
    #[inline]
    pub fn controllers(&self) -> &IndexMap<String, Instance> {
        &self.controllers
    }

    /// Returns the controller downcast to `T`, or `None` when no controller
    /// has that name or it was built as a different type
    pub fn controller<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.controllers
            .get(name)
            .and_then(|instance| instance.clone().downcast::<T>().ok())
    }

    /// Runs every registered cleanup hook in reverse build order (LIFO),
    /// continuing through failures and aggregating them
    ///
    /// The context's deadline is enforced cooperatively by the hooks
    /// themselves. Hooks run at most once; a second shutdown is a no-op.
    pub fn shutdown(&self, ctx: &CleanupContext) -> Result<(), CleanupError> {
        #[cfg(feature = "tracing")]
        tracing::info!("shutting down the application...");

        self.container.shutdown(ctx)
    }
}

impl Debug for App {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.graph.root())
            .field("modules", &self.graph.modules().len())
            .field("controllers", &self.controllers.len())
            .finish_non_exhaustive()
    }
}
