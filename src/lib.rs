//! Driver registration approval queue, passenger accounts and login sessions
//! for the mototaxi demo, persisted through a versioned key-value document store.

pub mod api;
pub mod registration;
