//! Snippetbox - a minimal web application for sharing text snippets
//!
//! This library provides the core functionality for the snippetbox
//! application: configuration, database access, session management,
//! template rendering, and the HTTP layer.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod templates;
pub mod web;
