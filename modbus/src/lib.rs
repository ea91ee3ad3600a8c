pub mod codec;
pub mod data;
pub mod frame;
pub mod master;
pub mod server;
pub mod store;
pub mod transport;
