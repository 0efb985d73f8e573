//! Yatube - a small blogging service
//!
//! Users publish posts, optionally in a group and with an image, and comment
//! on each other's posts. Readers browse paginated listings of all posts,
//! posts of one group, and posts of one author.

pub mod cache;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod templates;
pub mod web;
