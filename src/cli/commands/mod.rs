//! CLI command implementations

pub mod datasets;
pub mod init;
pub mod publish;
pub mod render;
