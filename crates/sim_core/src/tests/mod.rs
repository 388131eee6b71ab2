//! In-crate integration tests spanning several subsystems

mod config_files;
