//! Demonstrates cleanup hooks: providers register hooks on successful
//! builds, and shutdown runs them in reverse build order under an
//! externally supplied deadline.

use neva::{bootstrap, BoxError, CleanupContext, ModuleDef, ModuleRef, ProviderDef};
use std::{sync::Arc, time::Duration};

fn main() -> Result<(), BoxError> {
    let root: ModuleRef = Arc::new(
        ModuleDef::new("app")
            .with_provider(
                ProviderDef::new("app.pool", |_| Ok("pool".to_string())).with_cleanup(|ctx| {
                    println!("closing pool ({:?} left)", ctx.remaining());
                    Ok(())
                }),
            )
            .with_provider(
                ProviderDef::new("app.listener", |_| Ok("listener".to_string())).with_cleanup(
                    |ctx| {
                        println!("closing listener ({:?} left)", ctx.remaining());
                        Ok(())
                    },
                ),
            ),
    );

    let app = bootstrap(root)?;

    // build order decides teardown order: the listener was built last,
    // so its hook runs first
    app.get("app.pool")?;
    app.get("app.listener")?;

    app.shutdown(&CleanupContext::with_timeout(Duration::from_secs(5)))?;

    Ok(())
}
