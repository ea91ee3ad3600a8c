use super::{
    BANK_SIZE, COIL_OFF, COIL_ON, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_RW_WRITE_REGISTERS,
    MAX_WRITE_OBJECTS,
};

pub fn check_read_coils_count(nobjs: u16) -> bool {
    (1..=MAX_READ_COILS).contains(&nobjs)
}

pub fn check_read_registers_count(nobjs: u16) -> bool {
    (1..=MAX_READ_REGISTERS).contains(&nobjs)
}

/// Same literal bound for coils and registers.
pub fn check_write_count(nobjs: u16) -> bool {
    (1..=MAX_WRITE_OBJECTS).contains(&nobjs)
}

pub fn check_rw_write_count(nobjs: u16) -> bool {
    (1..=MAX_RW_WRITE_REGISTERS).contains(&nobjs)
}

/// Slot `address + 1` holds protocol address `address`, so the last touched
/// slot is `address + nobjs` and has to stay inside the bank.
pub fn check_range(address: u16, nobjs: u16) -> bool {
    address as usize + 1 + nobjs as usize <= BANK_SIZE
}

pub fn check_coil_value(value: u16) -> bool {
    value == COIL_ON || value == COIL_OFF
}
