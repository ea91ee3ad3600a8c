pub mod port;
pub mod silence;
pub mod slave;
