pub mod proxy;
pub mod server;
pub mod validation;

pub use proxy::{routes, AppState};
pub use server::WebServer;
