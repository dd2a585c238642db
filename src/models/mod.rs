// src/models/mod.rs

pub mod attempt;
pub mod phase;
pub mod quiz;
pub mod statistics;
pub mod user;
