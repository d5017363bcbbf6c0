//! Server front end: route registration and the accept loop.

pub mod listener;
pub mod router;

pub use listener::{HttpServer, ServerHandle};
pub use router::{Handler, RouteTable};
