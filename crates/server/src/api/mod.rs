pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod session;
pub mod tracks;
pub mod ws;

pub use routes::create_router;
