pub mod context;
pub mod crc;
pub mod error;
pub mod mbap;
pub mod pdu;
pub mod slave;

macro_rules! wait {
    ($op:expr) => {
        if let Some(x) = $op {
            x
        } else {
            return Ok(None);
        }
    };
}

pub(crate) use wait;
