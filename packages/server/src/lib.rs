// Press - content backend core
//
// This crate provides the persisted task engine and the content-migration
// pipeline it drives: WXR import/export and image rehosting.
//
// Domain logic lives in domains/*/activities; infrastructure traits and the
// task runner live in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
