pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod session;

pub use client::PortfolioClient;
pub use error::ClientError;
