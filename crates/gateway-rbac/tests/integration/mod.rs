//! Integration tests for the authorization kernel.
//!
//! This module covers:
//! - Permission matching, scopes and read-only protection
//! - User-level decisions and collection filtering
//! - Secured operations run through the interceptor

pub mod common;
pub mod matcher;
pub mod services;
