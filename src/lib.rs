// src/lib.rs

//! anifeed: turns an anime torrent tracker listing into an Atom feed.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
