pub mod checks;
pub mod helpers;
pub mod queue;
pub mod storage;

pub const MAX_PDU_SIZE: usize = 253; // Max. size of  protocol data unit
pub const MAX_DATA_SIZE: usize = 256; // used for storing data in internal structs. Should has length that divides by 2
pub const MAX_ADU_SIZE: usize = 260; // MBAP header + PDU

pub const BANK_SIZE: usize = 65535; // slots per bank

pub const MAX_READ_COILS: u16 = 0x07D0; // FC1, FC2
pub const MAX_READ_REGISTERS: u16 = 0x007D; // FC3, FC4, FC23 (read part)
pub const MAX_WRITE_OBJECTS: u16 = 0x07B0; // FC15, FC16
pub const MAX_RW_WRITE_REGISTERS: u16 = 0x0079; // FC23 (write part)

pub const COIL_ON: u16 = 0xFF00;
pub const COIL_OFF: u16 = 0x0000;

pub mod prelude {
    pub use super::queue::FixedQueue;
    pub use super::storage::DataStorage as Data;
    pub use super::{BANK_SIZE, MAX_ADU_SIZE, MAX_DATA_SIZE, MAX_PDU_SIZE};
    pub use super::{COIL_OFF, COIL_ON};
}
