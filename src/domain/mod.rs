//! Pure helpers shared by the rendering pipeline.

pub mod slug;
