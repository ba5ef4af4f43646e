//! Core traits shared by the store and HTTP crates.

mod token_store;

pub use token_store::TokenStore;
