pub mod cli;
pub mod configuration;
pub mod controller;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod helpers;
pub mod mapper;
pub mod provider;
pub mod range;
pub mod router;
pub mod server;
pub mod types;
