//! Application services: the rendering pipeline and the site map built on it.

pub mod error;
pub mod render;
pub mod site;
