pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod notifications;
pub mod orders;
pub mod routes;
pub mod ws;

pub use routes::create_router;
pub use ws::WsMessage;
