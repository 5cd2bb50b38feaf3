use std::sync::Arc;

use hdx_auth::SessionIssuer;
use hdx_core::{ModuleRegistry, Verb};
use tracing::debug;

pub mod init;
pub mod sessions;
pub mod users;

pub use init::InitModule;
pub use sessions::SessionsModule;
pub use users::UsersModule;

pub fn configure(sessions: Arc<SessionIssuer>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register(
            "init",
            Arc::new(InitModule {
                sessions: Arc::clone(&sessions),
            }),
        )
        .register("sessions", Arc::new(SessionsModule { sessions }))
        .register("users", Arc::new(UsersModule));

    for name in registry.names() {
        if let Some(module) = registry.get(name) {
            let caps = module.capabilities();
            let verbs: Vec<&str> = Verb::ALL
                .iter()
                .filter(|v| caps.allows(**v))
                .map(|v| v.as_str())
                .collect();
            debug!(module = name, ?verbs, "module registered");
        }
    }

    registry
}
