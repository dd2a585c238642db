// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod phase;
pub mod quiz;
pub mod statistics;
pub mod teacher;
