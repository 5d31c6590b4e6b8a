pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod ledger;
pub mod realtime;
pub mod registry;
pub mod server;
pub mod sync;
