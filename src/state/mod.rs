pub mod snapshot_store;
pub mod subscriptions;

pub use snapshot_store::{JsonSnapshotStore, SnapshotStore};
pub use subscriptions::{
    create_shared_subscription_registry, SharedSubscriptionRegistry, StartOutcome, StopOutcome,
    Subscription, SubscriptionRegistry,
};
