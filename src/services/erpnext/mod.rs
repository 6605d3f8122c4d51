// ERPNext Integration Module
// Remote RPC client plus the local/remote backend split

pub mod backend;
pub mod client;

pub use backend::{select_backend, ErpNextApi, ErpNextBackend, LocalBackend, RemoteBackend};
pub use client::{ErpNextClient, ErpNextConfig, ErpNextError};
