pub mod handlers;
pub mod interstitial;
pub mod routes;

pub use routes::create_redirect_router;
