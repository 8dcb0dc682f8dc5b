#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod content;
pub mod logging;
pub mod normalize;
pub mod pages;
pub mod preview;
pub mod render;
pub mod server;
pub mod strapi;
