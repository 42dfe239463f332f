//! Concurrency-safe lazy singleton container and module-scoped resolvers

use std::{
    any::type_name,
    collections::HashMap,
    fmt::{self, Debug, Display, Formatter},
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId}
};

use crate::{
    error::{Error, Redacted, SharedError},
    graph::Graph,
    lifecycle::{self, CleanupContext, CleanupEntry, CleanupError},
    module::{BuildFn, CleanupFn, Instance, Token},
    visibility::Visibility
};

/// Controls how the container treats a failed provider build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// A failed build is not cached as terminal: every caller that waited on
    /// the failing attempt receives its error, but a later, independent `get`
    /// re-attempts the build. This keeps a transient startup failure (a
    /// refused connection, a missing value supplied later) from permanently
    /// wedging the token. At most one build is in flight per token at any
    /// instant either way.
    #[default]
    Retry,

    /// The first failure is recorded and returned to every later call.
    Sticky,
}

enum BuildState {
    Unbuilt,
    Building { builder: ThreadId },
    Built(Instance),
    Failed(SharedError),
}

struct BuildCell {
    state: Mutex<BuildState>,
    ready: Condvar,
}

struct ProviderSlot {
    module: Arc<str>,
    build: BuildFn,
    cleanup: Option<CleanupFn>,
    sensitive: bool,
    cell: BuildCell,
}

struct Inner {
    slots: HashMap<Token, ProviderSlot>,
    visibility: Visibility,
    retry: RetryPolicy,
    cleanup: Mutex<Vec<CleanupEntry>>,
}

/// A registry of token → (owning module, provider) that lazily constructs
/// and memoizes singleton values
///
/// Each token has its own build cell, so unrelated providers never serialize
/// on a shared lock. The value (or failure) of a build attempt is observed
/// identically by every caller that waited on it.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("providers", &self.inner.slots.len())
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Indexes every provider in the graph, rejecting ambiguous ownership:
    /// a token claimed by two providers is a configuration error.
    pub(crate) fn new(
        graph: &Graph,
        visibility: Visibility,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let mut slots: HashMap<Token, ProviderSlot> = HashMap::new();
        for node in graph.modules() {
            let module: Arc<str> = Arc::from(node.name.as_str());
            for provider in &node.def.providers {
                if let Some(existing) = slots.get(provider.token()) {
                    return Err(Error::DuplicateProviderToken {
                        token: provider.token().clone(),
                        owner: existing.module.to_string(),
                        claimed_by: node.name.clone(),
                    });
                }
                slots.insert(provider.token().clone(), ProviderSlot {
                    module: module.clone(),
                    build: provider.build.clone(),
                    cleanup: provider.cleanup.clone(),
                    sensitive: provider.sensitive,
                    cell: BuildCell {
                        state: Mutex::new(BuildState::Unbuilt),
                        ready: Condvar::new(),
                    },
                });
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                slots,
                visibility,
                retry,
                cleanup: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Creates a resolver whose visibility is `module`'s scope
    pub(crate) fn resolver_for(&self, module: impl Into<Arc<str>>) -> Resolver {
        Resolver {
            container: self.clone(),
            module: module.into(),
        }
    }

    /// Resolves `token` on behalf of `module`'s scope
    ///
    /// An unknown token fails with [`Error::ProviderNotFound`]; a token that
    /// exists but is outside the caller's scope fails with
    /// [`Error::TokenNotVisible`]. Neither check touches build state.
    pub(crate) fn get(&self, module: &str, token: &Token) -> Result<Instance, Error> {
        let Some(slot) = self.inner.slots.get(token) else {
            return Err(Error::ProviderNotFound { token: token.clone() });
        };
        if !self.inner.visibility.allows(module, token) {
            return Err(Error::TokenNotVisible {
                module: module.to_string(),
                token: token.clone(),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("resolving \"{token}\" for module \"{module}\"");

        let mut waited = false;
        let mut state = lock(&slot.cell.state);
        loop {
            match &*state {
                BuildState::Built(value) => return Ok(value.clone()),
                BuildState::Failed(cause) if waited || self.inner.retry == RetryPolicy::Sticky => {
                    return Err(Error::ProviderBuild {
                        token: token.clone(),
                        cause: cause.clone(),
                    });
                }
                // Unbuilt, or a failed build a fresh caller may re-attempt
                BuildState::Unbuilt | BuildState::Failed(_) => {
                    *state = BuildState::Building { builder: thread::current().id() };
                    break;
                }
                BuildState::Building { builder } if *builder == thread::current().id() => {
                    // the factory resolved its own token while building it
                    return Err(Error::DependencyCycle { token: token.clone() });
                }
                BuildState::Building { .. } => {
                    waited = true;
                    state = wait(&slot.cell.ready, state);
                }
            }
        }
        drop(state);

        self.build(slot, token)
    }

    /// Runs the elected build outside the entry lock; waiters observe the
    /// recorded outcome once the cell is notified.
    fn build(&self, slot: &ProviderSlot, token: &Token) -> Result<Instance, Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!("building provider \"{token}\" in module \"{}\"", slot.module);

        let resolver = self.resolver_for(slot.module.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (slot.build)(&resolver)));

        match outcome {
            Ok(Ok(value)) => {
                if let Some(cleanup) = &slot.cleanup {
                    lock(&self.inner.cleanup).push(CleanupEntry {
                        token: token.clone(),
                        hook: cleanup.clone(),
                    });
                }
                let mut state = lock(&slot.cell.state);
                *state = BuildState::Built(value.clone());
                slot.cell.ready.notify_all();
                Ok(value)
            }
            Ok(Err(err)) => {
                let cause: SharedError = if slot.sensitive {
                    Arc::new(Redacted)
                } else {
                    err.into()
                };
                #[cfg(feature = "tracing")]
                tracing::error!("provider \"{token}\" failed to build: {cause}");

                let mut state = lock(&slot.cell.state);
                *state = BuildState::Failed(cause.clone());
                slot.cell.ready.notify_all();
                Err(Error::ProviderBuild { token: token.clone(), cause })
            }
            Err(payload) => {
                // record the failure before unwinding so waiters are not wedged
                let mut state = lock(&slot.cell.state);
                *state = BuildState::Failed(Arc::new(FactoryPanicked { token: token.clone() }));
                slot.cell.ready.notify_all();
                drop(state);
                panic::resume_unwind(payload);
            }
        }
    }

    /// Drains registered cleanup hooks and runs them in reverse build order
    pub(crate) fn shutdown(&self, ctx: &CleanupContext) -> Result<(), CleanupError> {
        let entries = std::mem::take(&mut *lock(&self.inner.cleanup));
        lifecycle::run_cleanup(ctx, entries)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn wait<'a, T>(ready: &Condvar, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    ready.wait(guard).unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct FactoryPanicked {
    token: Token,
}

impl Display for FactoryPanicked {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "provider \"{}\" factory panicked", self.token)
    }
}

impl std::error::Error for FactoryPanicked {}

/// A module-scoped view of the [`Container`], passed to provider and
/// controller factories and exposed by the application handle
///
/// All resolution goes through the scope's visibility set. The resolver a
/// provider factory receives is scoped to the provider's *owning* module,
/// so a provider may depend on tokens visible to its own module regardless
/// of who requested it.
#[derive(Clone)]
pub struct Resolver {
    container: Container,
    module: Arc<str>,
}

impl Resolver {
    /// Resolves a token to its opaque shared value
    pub fn get(&self, token: impl Into<Token>) -> Result<Instance, Error> {
        let token = token.into();
        self.container.get(&self.module, &token)
    }

    /// Resolves a token and downcasts the value to a shared `T`
    ///
    /// Fails with [`Error::TypeMismatch`] when the provider built a value
    /// of a different type.
    pub fn resolve_shared<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Arc<T>, Error> {
        let token = token.into();
        self.container
            .get(&self.module, &token)?
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch { token, expected: type_name::<T>() })
    }

    /// Resolves a token and returns a cloned `T`
    ///
    /// `T` must implement [`Clone`], otherwise use
    /// [`resolve_shared`](Resolver::resolve_shared) to get a shared pointer.
    pub fn resolve<T: Clone + Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<T, Error> {
        self.resolve_shared::<T>(token).map(|value| value.as_ref().clone())
    }

    /// Returns the name of the module this resolver is scoped to
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}
