pub mod config;
pub mod filename;
pub mod handlers;
pub mod models;
pub mod qr;
pub mod routes;
pub mod storage;
pub mod views;
