//! Nutrack Library
//!
//! Ingredients, meals, a food diary, body measurements and nutrition goals
//! over SQLite, served as MCP tools.

pub mod assistant;
pub mod build_info;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod mcp;
pub mod models;
pub mod notify;
pub mod nutrition;
pub mod tools;
