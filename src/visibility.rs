//! Per-module visibility scopes

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::{
    error::Error,
    graph::{Graph, GraphNode},
    module::Token
};

/// The set of tokens each module's scope is permitted to resolve
///
/// A module sees its own providers' tokens plus whatever its direct imports
/// explicitly export. Visibility is not transitive: a token exported by `A`
/// and imported through `B` reaches `C` only if `B` re-exports it. This is
/// what enforces module encapsulation per import hop.
#[derive(Debug, Default)]
pub struct Visibility {
    scopes: IndexMap<String, IndexSet<Token>>,
}

impl Visibility {
    /// Computes the visibility table for a flattened graph
    ///
    /// Export validity is checked here: every token a module exports must be
    /// resolvable by the module itself, either through one of its own
    /// providers or as a re-export of a direct import's export. An
    /// unresolvable export fails with [`Error::ExportNotResolvable`].
    pub fn compute(graph: &Graph) -> Result<Self, Error> {
        let nodes: HashMap<&str, &GraphNode> = graph
            .modules()
            .iter()
            .map(|node| (node.name.as_str(), node))
            .collect();

        let mut scopes = IndexMap::with_capacity(graph.modules().len());
        for node in graph.modules() {
            let mut visible = IndexSet::new();
            for provider in &node.def.providers {
                visible.insert(provider.token().clone());
            }
            for import in &node.imports {
                if let Some(imported) = nodes.get(import.as_str()) {
                    for token in &imported.def.exports {
                        visible.insert(token.clone());
                    }
                }
            }

            for token in &node.def.exports {
                if !visible.contains(token) {
                    return Err(Error::ExportNotResolvable {
                        module: node.name.clone(),
                        token: token.clone(),
                    });
                }
            }

            scopes.insert(node.name.clone(), visible);
        }

        Ok(Self { scopes })
    }

    /// Returns whether `module`'s scope may resolve `token`
    #[inline]
    pub fn allows(&self, module: &str, token: &Token) -> bool {
        self.scopes
            .get(module)
            .is_some_and(|scope| scope.contains(token))
    }

    /// Returns the tokens visible to `module`, in insertion order
    pub fn tokens(&self, module: &str) -> Option<&IndexSet<Token>> {
        self.scopes.get(module)
    }
}

#[cfg(test)]
mod tests {
    use super::Visibility;
    use crate::{
        error::Error,
        graph,
        module::{ModuleDef, ModuleRef, ProviderDef, Token}
    };
    use std::sync::Arc;

    #[test]
    fn it_includes_own_tokens_and_imported_exports() {
        let database: ModuleRef = Arc::new(
            ModuleDef::new("database")
                .with_provider(ProviderDef::new("db.pool", |_| Ok(0_u8)))
                .with_provider(ProviderDef::new("db.internal", |_| Ok(0_u8)))
                .with_export("db.pool"),
        );
        let root: ModuleRef = Arc::new(
            ModuleDef::new("app")
                .with_import(database)
                .with_provider(ProviderDef::new("app.config", |_| Ok(0_u8))),
        );

        let graph = graph::build(&root).unwrap();
        let visibility = Visibility::compute(&graph).unwrap();

        assert!(visibility.allows("app", &Token::from("app.config")));
        assert!(visibility.allows("app", &Token::from("db.pool")));
        assert!(!visibility.allows("app", &Token::from("db.internal")));
        assert!(visibility.allows("database", &Token::from("db.internal")));
    }

    #[test]
    fn it_is_not_transitive_without_a_reexport() {
        let a: ModuleRef = Arc::new(
            ModuleDef::new("a")
                .with_provider(ProviderDef::new("a.value", |_| Ok(0_u8)))
                .with_export("a.value"),
        );
        let b: ModuleRef = Arc::new(ModuleDef::new("b").with_import(a));
        let c: ModuleRef = Arc::new(ModuleDef::new("c").with_import(b));

        let graph = graph::build(&c).unwrap();
        let visibility = Visibility::compute(&graph).unwrap();

        assert!(visibility.allows("b", &Token::from("a.value")));
        assert!(!visibility.allows("c", &Token::from("a.value")));
    }

    #[test]
    fn it_follows_explicit_reexports_one_hop_at_a_time() {
        let a: ModuleRef = Arc::new(
            ModuleDef::new("a")
                .with_provider(ProviderDef::new("a.value", |_| Ok(0_u8)))
                .with_export("a.value"),
        );
        let b: ModuleRef = Arc::new(
            ModuleDef::new("b")
                .with_import(a)
                .with_export("a.value"),
        );
        let c: ModuleRef = Arc::new(ModuleDef::new("c").with_import(b));

        let graph = graph::build(&c).unwrap();
        let visibility = Visibility::compute(&graph).unwrap();

        assert!(visibility.allows("c", &Token::from("a.value")));
    }

    #[test]
    fn it_rejects_unresolvable_exports() {
        let root: ModuleRef = Arc::new(ModuleDef::new("app").with_export("ghost.token"));

        let graph = graph::build(&root).unwrap();
        let err = Visibility::compute(&graph).unwrap_err();

        match err {
            Error::ExportNotResolvable { module, token } => {
                assert_eq!(module, "app");
                assert_eq!(token, Token::from("ghost.token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
