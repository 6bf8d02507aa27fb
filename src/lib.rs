//! Notification gateway: one HTTP surface in front of group bots, work-app
//! messaging and SMS providers, with a durable delivery history.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod server;
