//! HTTP surface: site pages from the prebuilt map plus static assets.

mod middleware;
mod public;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router};
