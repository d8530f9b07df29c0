pub mod config;
pub mod connection;
pub mod errors;
pub mod handlers;
pub mod stream;
pub mod target;
pub use config::*;
pub use connection::*;
pub use errors::*;
pub use handlers::*;
pub use stream::*;
pub use target::*;
