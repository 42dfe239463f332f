//! Module contracts: tokens, definitions and capabilities

use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc
};

use crate::{
    container::Resolver,
    error::BoxError,
    lifecycle::CleanupContext
};

/// An opaque key identifying a resolvable value
///
/// Tokens are the only addressing mechanism in the container; no type
/// information is attached to the token itself. By convention they are
/// dotted, module-prefixed names such as `"db.pool"` or `"users.service"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(Arc<str>);

impl Token {
    /// Creates a new token
    #[inline]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the token name
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    #[inline]
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for Token {
    #[inline]
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&Token> for Token {
    #[inline]
    fn from(token: &Token) -> Self {
        token.clone()
    }
}

impl AsRef<str> for Token {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque resolved value shared between all callers of a token
pub type Instance = Arc<
    dyn Any
    + Send
    + Sync
>;

/// A factory function that builds a provider or controller instance
pub type BuildFn = Arc<
    dyn Fn(&Resolver) -> Result<Instance, BoxError>
    + Send
    + Sync
>;

/// A shutdown hook registered by a provider once its value has been built
pub type CleanupFn = Arc<
    dyn Fn(&CleanupContext) -> Result<(), BoxError>
    + Send
    + Sync
>;

/// A capability producing a module definition snapshot
///
/// The kernel calls [`definition`](Module::definition) exactly once per module
/// instance while flattening the import graph and never mutates the result.
/// Module identity (the `Arc` allocation, not the name) keys the traversal,
/// so a module reachable through several import paths must be shared as one
/// [`ModuleRef`] to be expanded once.
pub trait Module: Send + Sync {
    /// Produces the module definition
    fn definition(&self) -> Result<ModuleDef, BoxError>;
}

/// A shared handle to a module capability
pub type ModuleRef = Arc<dyn Module>;

/// A snapshot of a module: its name, imports, providers, controllers and exports
#[derive(Clone)]
pub struct ModuleDef {
    /// Unique module name, used for scoping and diagnostics
    pub name: String,

    /// Modules whose exports become visible to this module
    pub imports: Vec<ModuleRef>,

    /// Factories owned by this module, keyed by token
    pub providers: Vec<ProviderDef>,

    /// Request handlers owned by this module, built eagerly at bootstrap
    pub controllers: Vec<ControllerDef>,

    /// Tokens this module makes available to its direct importers
    pub exports: Vec<Token>,
}

impl ModuleDef {
    /// Creates an empty module definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imports: Vec::new(),
            providers: Vec::new(),
            controllers: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Adds an imported module
    pub fn with_import(mut self, module: ModuleRef) -> Self {
        self.imports.push(module);
        self
    }

    /// Adds a provider owned by this module
    pub fn with_provider(mut self, provider: ProviderDef) -> Self {
        self.providers.push(provider);
        self
    }

    /// Adds a controller owned by this module
    pub fn with_controller(mut self, controller: ControllerDef) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Exports a token to this module's direct importers
    ///
    /// Providing a token does not itself make it importable; only exported
    /// tokens are visible one hop up.
    pub fn with_export(mut self, token: impl Into<Token>) -> Self {
        self.exports.push(token.into());
        self
    }
}

impl Debug for ModuleDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDef")
            .field("name", &self.name)
            .field("imports", &self.imports.len())
            .field("providers", &self.providers.len())
            .field("controllers", &self.controllers.len())
            .field("exports", &self.exports)
            .finish()
    }
}

/// A plain definition is itself a module capability, so leaf modules
/// without construction-time state need no bespoke type.
impl Module for ModuleDef {
    fn definition(&self) -> Result<ModuleDef, BoxError> {
        Ok(self.clone())
    }
}

/// A factory bound to a token, building a lazy singleton on first resolution
#[derive(Clone)]
pub struct ProviderDef {
    pub(crate) token: Token,
    pub(crate) build: BuildFn,
    pub(crate) cleanup: Option<CleanupFn>,
    pub(crate) sensitive: bool,
}

impl ProviderDef {
    /// Creates a provider for `token` backed by a typed factory
    ///
    /// The factory receives a [`Resolver`] scoped to the module that owns
    /// this provider, regardless of which module requested the token.
    pub fn new<T, F>(token: impl Into<Token>, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let build: BuildFn = Arc::new(move |resolver: &Resolver| {
            build(resolver).map(|value| Arc::new(value) as Instance)
        });
        Self {
            token: token.into(),
            build,
            cleanup: None,
            sensitive: false,
        }
    }

    /// Registers a shutdown hook, executed in reverse build order once
    /// the built value is being torn down
    pub fn with_cleanup<F>(mut self, cleanup: F) -> Self
    where
        F: Fn(&CleanupContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(cleanup));
        self
    }

    /// Marks the provider as sensitive: build failures are reported with
    /// their cause replaced by a generic message, keeping secret material
    /// out of error chains and logs
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Returns the token this provider owns
    #[inline]
    pub fn token(&self) -> &Token {
        &self.token
    }
}

impl Debug for ProviderDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDef")
            .field("token", &self.token)
            .field("sensitive", &self.sensitive)
            .finish_non_exhaustive()
    }
}

/// A factory bound to a name, built eagerly at bootstrap and consumed
/// by an external adapter such as an HTTP router
#[derive(Clone)]
pub struct ControllerDef {
    pub(crate) name: String,
    pub(crate) build: BuildFn,
}

impl ControllerDef {
    /// Creates a controller backed by a typed factory
    pub fn new<T, F>(name: impl Into<String>, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let build: BuildFn = Arc::new(move |resolver: &Resolver| {
            build(resolver).map(|value| Arc::new(value) as Instance)
        });
        Self { name: name.into(), build }
    }

    /// Returns the controller name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for ControllerDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
