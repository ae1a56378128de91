//! Wallet packager library.
//!
//! This crate stages, archives, signs and publishes the pluggable modules of
//! the RaspberryWallet backend, and syncs the web frontend build into the
//! backend's static assets. It is used by the `wallet-packager` CLI binary and
//! can be driven programmatically with substitute executors and credential
//! providers.
//!
//! # Modules
//!
//! - [`archiver`] - Class-to-jar archiving of staged modules
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered packager configuration
//! - [`credentials`] - Administrator and keystore password providers
//! - [`error`] - Error types naming the failing stage and artifact
//! - [`executor`] - External command execution with timeouts
//! - [`module_name`] - Semantic wrapper for module names and derived paths
//! - [`output`] - Progress and dry-run formatting
//! - [`pipeline`] - Packaging phase orchestration
//! - [`privilege`] - Staging directory bootstrap via `sudo`
//! - [`project`] - Project root detection
//! - [`publisher`] - Copying signed modules into the project tree
//! - [`scanner`] - Directory scans for staged and published artifacts
//! - [`signer`] - Jar signing with the project keystore
//! - [`stager`] - Copying compiled classes into the staging directory
//! - [`verify`] - Signature verification of published modules
//! - [`webapp`] - Frontend build and asset sync

pub mod archiver;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod module_name;
pub mod output;
pub mod pipeline;
pub mod privilege;
pub mod project;
pub mod publisher;
pub mod scanner;
pub mod signer;
pub mod stager;
pub mod verify;
pub mod webapp;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
