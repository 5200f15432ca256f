//! Command implementations

pub mod async_utils;
pub mod batch;
pub mod notify;
pub mod profile;
pub mod vm;
