//! Error types for graph construction, resolution and bootstrap

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    sync::Arc
};

use crate::module::Token;

/// A boxed, thread-safe error produced by user factories and module definitions
pub type BoxError = Box<
    dyn StdError
    + Send
    + Sync
>;

/// A shared error cause that can be handed to every waiter of a failed build
pub type SharedError = Arc<
    dyn StdError
    + Send
    + Sync
>;

/// Represents a module resolution or bootstrap error
#[derive(Debug, Clone)]
pub enum Error {
    /// The import tree contains a cycle; the path lists module names up to the repeated one
    CyclicImport { path: Vec<String> },

    /// A module's `definition()` call failed; `importer` names the module that declared the import
    DefinitionFailed { importer: Option<String>, cause: SharedError },

    /// Two distinct module instances share a name
    DuplicateModuleName { name: String },

    /// Two providers claim the same token
    DuplicateProviderToken { token: Token, owner: String, claimed_by: String },

    /// A module exports a token that neither its own providers
    /// nor its direct imports' exports can resolve
    ExportNotResolvable { module: String, token: Token },

    /// The token exists in the graph but is outside the calling module's scope
    TokenNotVisible { module: String, token: Token },

    /// No provider in the graph owns the token
    ProviderNotFound { token: Token },

    /// The owning provider's factory returned an error
    ProviderBuild { token: Token, cause: SharedError },

    /// A provider's factory resolved its own token while building it
    DependencyCycle { token: Token },

    /// A controller factory failed during bootstrap
    ControllerBuild { module: String, controller: String, cause: SharedError },

    /// Two controllers across the assembled application share a name
    DuplicateControllerName { name: String },

    /// The token resolved to a value of a different type than requested
    TypeMismatch { token: Token, expected: &'static str },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::CyclicImport { path } =>
                write!(f, "cyclic module import: {}", path.join(" -> ")),
            Error::DefinitionFailed { importer: Some(importer), cause } =>
                write!(f, "module definition failed (imported by \"{importer}\"): {cause}"),
            Error::DefinitionFailed { importer: None, cause } =>
                write!(f, "root module definition failed: {cause}"),
            Error::DuplicateModuleName { name } =>
                write!(f, "duplicate module name \"{name}\""),
            Error::DuplicateProviderToken { token, owner, claimed_by } =>
                write!(f, "token \"{token}\" is provided by both \"{owner}\" and \"{claimed_by}\""),
            Error::ExportNotResolvable { module, token } =>
                write!(f, "module \"{module}\" exports \"{token}\" but cannot resolve it"),
            Error::TokenNotVisible { module, token } =>
                write!(f, "token \"{token}\" is not visible from module \"{module}\""),
            Error::ProviderNotFound { token } =>
                write!(f, "no provider found for token \"{token}\""),
            Error::ProviderBuild { token, cause } =>
                write!(f, "provider \"{token}\" failed to build: {cause}"),
            Error::DependencyCycle { token } =>
                write!(f, "provider \"{token}\" depends on its own token"),
            Error::ControllerBuild { module, controller, cause } =>
                write!(f, "controller \"{controller}\" in module \"{module}\" failed to build: {cause}"),
            Error::DuplicateControllerName { name } =>
                write!(f, "duplicate controller name \"{name}\""),
            Error::TypeMismatch { token, expected } =>
                write!(f, "token \"{token}\" resolved to a different type, expected {expected}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::DefinitionFailed { cause, .. }
            | Error::ProviderBuild { cause, .. }
            | Error::ControllerBuild { cause, .. } => {
                let cause: &(dyn StdError + 'static) = &**cause;
                Some(cause)
            }
            _ => None,
        }
    }
}

/// Replaces the cause of a failed build when the provider is marked sensitive
#[derive(Debug, Clone, Copy)]
pub struct Redacted;

impl Display for Redacted {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("cause withheld: provider is marked sensitive")
    }
}

impl StdError for Redacted {}
