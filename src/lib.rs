pub mod api;
pub mod app;
pub mod config;
pub mod geo;
pub mod models;
pub mod redirect;
pub mod storage;
pub mod tracking;
