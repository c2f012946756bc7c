//! Route handlers

pub mod history;
pub mod info;
pub mod predictions;
