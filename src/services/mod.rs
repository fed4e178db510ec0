//! Business logic services

pub mod broadcast;

pub use broadcast::{ScopedBroadcaster, ScopedEvent, Subscription};
