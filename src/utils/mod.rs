//! Shared utilities: external commands, hashing, paths.

pub mod exec;
pub mod hash;
pub mod path;
