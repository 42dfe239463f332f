//! Import graph construction

use std::{
    collections::HashMap,
    sync::Arc
};

use crate::{
    error::Error,
    module::{ModuleDef, ModuleRef}
};

/// A flattened module: its resolved name, the names of its direct imports
/// and the definition snapshot taken during traversal
#[derive(Debug)]
pub struct GraphNode {
    /// Module name
    pub name: String,

    /// Names of the module's direct imports, in declaration order
    pub imports: Vec<String>,

    /// The definition snapshot; read-only after graph construction
    pub def: ModuleDef,
}

/// The flattened import tree of a root module
///
/// Nodes are stored in discovery order: depth-first from the root, each
/// import subtree in declaration order. Downstream iteration (controller
/// builds, diagnostics) relies on this order being deterministic.
#[derive(Debug)]
pub struct Graph {
    modules: Vec<GraphNode>,
    root: String,
}

impl Graph {
    /// Returns the flattened modules in discovery order
    #[inline]
    pub fn modules(&self) -> &[GraphNode] {
        &self.modules
    }

    /// Returns the root module name
    #[inline]
    pub fn root(&self) -> &str {
        &self.root
    }
}

/// Flattens the import tree of `root` into a [`Graph`]
///
/// Traversal is keyed by module identity, not name: a module shared between
/// several importers (diamond import) is expanded exactly once, while
/// re-encountering a module whose expansion is still in progress is a cycle
/// and fails with [`Error::CyclicImport`]. Two distinct instances sharing a
/// name fail with [`Error::DuplicateModuleName`], since names key the
/// visibility scopes downstream.
pub fn build(root: &ModuleRef) -> Result<Graph, Error> {
    let mut builder = Builder::default();
    let root_name = builder.visit(root)?;

    Ok(Graph {
        modules: builder.modules,
        root: root_name,
    })
}

enum Visit {
    InProgress(String),
    Done(String),
}

/// The address of the module allocation; stable while the graph holds
/// its `ModuleRef`s alive.
fn identity(module: &ModuleRef) -> usize {
    Arc::as_ptr(module) as *const () as usize
}

#[derive(Default)]
struct Builder {
    state: HashMap<usize, Visit>,
    names: HashMap<String, usize>,
    path: Vec<String>,
    modules: Vec<GraphNode>,
}

impl Builder {
    fn visit(&mut self, module: &ModuleRef) -> Result<String, Error> {
        let id = identity(module);
        if let Some(visit) = self.state.get(&id) {
            return match visit {
                Visit::Done(name) => Ok(name.clone()),
                Visit::InProgress(name) => {
                    let mut path = self.path.clone();
                    path.push(name.clone());
                    Err(Error::CyclicImport { path })
                }
            };
        }

        let def = module.definition().map_err(|cause| Error::DefinitionFailed {
            importer: self.path.last().cloned(),
            cause: cause.into(),
        })?;

        let name = def.name.clone();
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateModuleName { name });
        }
        self.names.insert(name.clone(), id);
        self.state.insert(id, Visit::InProgress(name.clone()));
        self.path.push(name.clone());

        let imports = def.imports.clone();
        let index = self.modules.len();
        self.modules.push(GraphNode {
            name: name.clone(),
            imports: Vec::new(),
            def,
        });

        let mut import_names = Vec::with_capacity(imports.len());
        for import in &imports {
            import_names.push(self.visit(import)?);
        }
        self.modules[index].imports = import_names;

        self.path.pop();
        self.state.insert(id, Visit::Done(name.clone()));
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::build;
    use crate::{
        error::{BoxError, Error},
        module::{Module, ModuleDef, ModuleRef}
    };
    use std::sync::{Arc, Mutex};

    fn leaf(name: &str) -> ModuleRef {
        Arc::new(ModuleDef::new(name))
    }

    #[test]
    fn it_flattens_imports_in_discovery_order() {
        let d = leaf("d");
        let b: ModuleRef = Arc::new(ModuleDef::new("b").with_import(d));
        let c = leaf("c");
        let root: ModuleRef = Arc::new(
            ModuleDef::new("a")
                .with_import(b)
                .with_import(c),
        );

        let graph = build(&root).unwrap();
        let names: Vec<&str> = graph.modules().iter().map(|n| n.name.as_str()).collect();

        assert_eq!(names, ["a", "b", "d", "c"]);
        assert_eq!(graph.root(), "a");
        assert_eq!(graph.modules()[0].imports, ["b", "c"]);
    }

    #[test]
    fn it_expands_diamond_imports_once() {
        let shared = leaf("shared");
        let left: ModuleRef = Arc::new(ModuleDef::new("left").with_import(shared.clone()));
        let right: ModuleRef = Arc::new(ModuleDef::new("right").with_import(shared));
        let root: ModuleRef = Arc::new(
            ModuleDef::new("app")
                .with_import(left)
                .with_import(right),
        );

        let graph = build(&root).unwrap();
        let names: Vec<&str> = graph.modules().iter().map(|n| n.name.as_str()).collect();

        assert_eq!(names, ["app", "left", "shared", "right"]);
        assert_eq!(graph.modules()[3].imports, ["shared"]);
    }

    struct Cyclic {
        name: &'static str,
        next: Mutex<Option<ModuleRef>>,
    }

    impl Cyclic {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, next: Mutex::new(None) })
        }

        fn set_next(&self, next: ModuleRef) {
            *self.next.lock().unwrap() = Some(next);
        }
    }

    impl Module for Cyclic {
        fn definition(&self) -> Result<ModuleDef, BoxError> {
            let next = self.next.lock().unwrap().clone();
            let mut def = ModuleDef::new(self.name);
            if let Some(next) = next {
                def = def.with_import(next);
            }
            Ok(def)
        }
    }

    #[test]
    fn it_rejects_cyclic_imports() {
        let a = Cyclic::new("a");
        let b = Cyclic::new("b");
        a.set_next(b.clone());
        b.set_next(a.clone());

        let root: ModuleRef = a;
        let err = build(&root).unwrap_err();

        match err {
            Error::CyclicImport { path } => assert_eq!(path, ["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn it_rejects_self_imports() {
        let a = Cyclic::new("a");
        a.set_next(a.clone());

        let root: ModuleRef = a;
        let err = build(&root).unwrap_err();

        assert!(matches!(err, Error::CyclicImport { .. }));
    }

    #[test]
    fn it_rejects_duplicate_module_names() {
        let first = leaf("dup");
        let second = leaf("dup");
        let root: ModuleRef = Arc::new(
            ModuleDef::new("app")
                .with_import(first)
                .with_import(second),
        );

        let err = build(&root).unwrap_err();

        match err {
            Error::DuplicateModuleName { name } => assert_eq!(name, "dup"),
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Broken;

    impl Module for Broken {
        fn definition(&self) -> Result<ModuleDef, BoxError> {
            Err("definition exploded".into())
        }
    }

    #[test]
    fn it_wraps_definition_failures_with_the_importer() {
        let root: ModuleRef = Arc::new(ModuleDef::new("app").with_import(Arc::new(Broken)));

        let err = build(&root).unwrap_err();

        match err {
            Error::DefinitionFailed { importer, cause } => {
                assert_eq!(importer.as_deref(), Some("app"));
                assert_eq!(cause.to_string(), "definition exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn it_reports_a_failing_root_definition() {
        let root: ModuleRef = Arc::new(Broken);

        let err = build(&root).unwrap_err();

        assert!(matches!(err, Error::DefinitionFailed { importer: None, .. }));
    }
}
