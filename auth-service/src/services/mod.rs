pub mod auth_service;
pub mod cleanup;
pub mod kafka_events;

pub use auth_service::{AuthService, ClientMeta, Introspection, TokenPair};
pub use cleanup::{spawn_cleanup_tasks, CleanupService};
pub use kafka_events::EmailProducer;
