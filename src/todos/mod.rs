//! The todo collection: domain types, remote client, pagination feed and
//! optimistic mutations.

pub mod api_types;
pub mod client;
pub mod feed;
pub mod keys;
pub mod mutations;
pub mod types;

#[cfg(test)]
pub mod testing;
