//! A small web client: fetch a page, show its markup, offer its first links
//! and keep a back/forward history per profile.

pub mod address;
pub mod client;
pub mod config;
pub mod identity;
pub mod logging;
pub mod markup;
pub mod session;
pub mod store;
