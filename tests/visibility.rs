#![allow(missing_docs)]

use neva::{bootstrap, ControllerDef, Error, ModuleDef, ModuleRef, ProviderDef, Token};
use std::sync::Arc;

fn value_module() -> ModuleRef {
    Arc::new(
        ModuleDef::new("a")
            .with_provider(ProviderDef::new("a.value", |_| Ok("from a".to_string())))
            .with_export("a.value"),
    )
}

#[test]
fn it_hides_tokens_not_reexported_along_the_chain() {
    // a exports "a.value"; b imports a but declares no exports; c imports b only
    let a = value_module();
    let b: ModuleRef = Arc::new(ModuleDef::new("b").with_import(a));
    let c: ModuleRef = Arc::new(ModuleDef::new("c").with_import(b));

    let app = bootstrap(c).unwrap();
    let err = app.get("a.value").unwrap_err();

    match err {
        Error::TokenNotVisible { module, token } => {
            assert_eq!(module, "c");
            assert_eq!(token, Token::from("a.value"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn it_reaches_tokens_reexported_at_every_hop() {
    let a = value_module();
    let b: ModuleRef = Arc::new(
        ModuleDef::new("b")
            .with_import(a)
            .with_export("a.value"),
    );
    let c: ModuleRef = Arc::new(ModuleDef::new("c").with_import(b));

    let app = bootstrap(c).unwrap();

    assert_eq!(app.resolve::<String>("a.value").unwrap(), "from a");
}

#[test]
fn it_keeps_intermediate_scopes_working_while_hiding_the_root() {
    // b itself sees "a.value" (its controller builds fine),
    // yet the root one hop further up does not
    let a = value_module();
    let b: ModuleRef = Arc::new(
        ModuleDef::new("b")
            .with_import(a)
            .with_controller(ControllerDef::new("b.reader", |r| {
                Ok(r.resolve::<String>("a.value")?)
            })),
    );
    let c: ModuleRef = Arc::new(ModuleDef::new("c").with_import(b));

    let app = bootstrap(c).unwrap();

    assert_eq!(*app.controller::<String>("b.reader").unwrap(), "from a");
    assert!(matches!(
        app.get("a.value").unwrap_err(),
        Error::TokenNotVisible { .. }
    ));
}

#[test]
fn it_fails_bootstrap_on_unresolvable_exports() {
    let broken: ModuleRef = Arc::new(ModuleDef::new("broken").with_export("ghost"));
    let root: ModuleRef = Arc::new(ModuleDef::new("app").with_import(broken));

    let err = bootstrap(root).unwrap_err();

    match err {
        Error::ExportNotResolvable { module, token } => {
            assert_eq!(module, "broken");
            assert_eq!(token, Token::from("ghost"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
