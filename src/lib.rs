//! Newsdesk - A News Aggregation Admin
//!
//! This crate ingests sources and top headlines from a NewsAPI-style service,
//! stores them in SQLite and serves an admin/viewer web interface for them.

pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod news_api;
pub mod page;
pub mod routes;
pub mod service;
