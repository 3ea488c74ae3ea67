//! Foundation types for pagetty.
//!
//! This crate holds the platform-agnostic types shared by the terminal core
//! and its front ends: the error enum, configuration structs, and key events.

pub mod config;
pub mod error;
pub mod input;
