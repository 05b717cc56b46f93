//! Bookstack Application Library
//!
//! This library provides the application modules for the bookstack catalog
//! service.

pub mod modules;
