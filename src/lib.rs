pub mod authz;
pub mod client;
pub mod cmd;
pub mod config;
pub mod display;
pub mod errors;
pub mod gateway;
pub mod logs;
pub mod resource;
pub mod server;
pub mod sync;
