#[macro_use]
extern crate diesel;

pub mod billing;
pub mod checker;
pub mod config;
pub mod db;
pub mod http_client;
pub mod models;
pub mod schema;

pub use config::Config;
