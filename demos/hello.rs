//! A minimal modular application: a database module exporting a connection
//! pool, a users module wiring a repository, a service and a controller,
//! and a root module importing both.

use neva::{bootstrap, BoxError, ControllerDef, Module, ModuleDef, ModuleRef, ProviderDef};
use std::sync::Arc;

const DB_POOL: &str = "db.pool";
const USERS_REPO: &str = "users.repo";
const USERS_SERVICE: &str = "users.service";

struct Pool {
    url: String,
}

impl Pool {
    fn query(&self) -> Vec<String> {
        vec![format!("ada@{}", self.url), format!("grace@{}", self.url)]
    }
}

struct DatabaseOptions {
    url: &'static str,
}

struct DatabaseModule {
    options: DatabaseOptions,
}

impl Module for DatabaseModule {
    fn definition(&self) -> Result<ModuleDef, BoxError> {
        let url = self.options.url;
        Ok(ModuleDef::new("database")
            .with_provider(ProviderDef::new(DB_POOL, move |_| {
                Ok(Pool { url: url.to_string() })
            }))
            .with_export(DB_POOL))
    }
}

struct UsersRepo {
    pool: Arc<Pool>,
}

struct UsersService {
    repo: Arc<UsersRepo>,
}

struct UsersController {
    service: Arc<UsersService>,
}

impl UsersController {
    fn list(&self) -> Vec<String> {
        self.service.repo.pool.query()
    }
}

fn users_module(database: ModuleRef) -> ModuleRef {
    Arc::new(
        ModuleDef::new("users")
            .with_import(database)
            .with_provider(ProviderDef::new(USERS_REPO, |r| {
                let pool = r.resolve_shared::<Pool>(DB_POOL)?;
                Ok(UsersRepo { pool })
            }))
            .with_provider(ProviderDef::new(USERS_SERVICE, |r| {
                let repo = r.resolve_shared::<UsersRepo>(USERS_REPO)?;
                Ok(UsersService { repo })
            }))
            .with_controller(ControllerDef::new("users", |r| {
                let service = r.resolve_shared::<UsersService>(USERS_SERVICE)?;
                Ok(UsersController { service })
            }))
            .with_export(USERS_SERVICE),
    )
}

fn main() -> Result<(), BoxError> {
    let database: ModuleRef = Arc::new(DatabaseModule {
        options: DatabaseOptions { url: "postgres://localhost" },
    });
    let root: ModuleRef = Arc::new(
        ModuleDef::new("app").with_import(users_module(database)),
    );

    let app = bootstrap(root)?;

    let users = app
        .controller::<UsersController>("users")
        .expect("users controller not registered");
    for user in users.list() {
        println!("{user}");
    }

    Ok(())
}
