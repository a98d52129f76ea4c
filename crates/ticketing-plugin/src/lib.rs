pub mod adapters;
pub mod http;
pub mod register;
pub mod rpc;

pub use adapters::{HttpHost, ProjectHost, RpcHost, RpcTool};
pub use http::ticket_router;
pub use register::{register, RegisterConfig, Registration};
