//! Markdown site renderer and server.
//!
//! The crate is split the same way as the binary's runtime: `application`
//! owns the rendering pipeline and site discovery, `infra` owns HTTP,
//! static assets and telemetry, `config` resolves layered settings, and
//! `domain` holds small pure helpers such as anchor slug generation.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
