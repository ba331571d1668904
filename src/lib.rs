pub mod config;
pub mod error;
pub mod schedule;
pub mod server;
pub mod whatsapp;
