//! In-memory register and coil banks.
//!
//! Each bank has 65535 slots and its own lock. Slot `a + 1` holds the value
//! of protocol address `a`; the dispatcher applies that offset, the store
//! itself works on raw slot indexes and never validates them.

pub mod bank;

pub use bank::Bank;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankKind {
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

#[derive(Debug, Default)]
pub struct Store {
    coils: Bank<bool>,
    discrete_inputs: Bank<bool>,
    holding_registers: Bank<i16>,
    input_registers: Bank<i16>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn coils(&self) -> &Bank<bool> {
        &self.coils
    }

    pub fn discrete_inputs(&self) -> &Bank<bool> {
        &self.discrete_inputs
    }

    pub fn holding_registers(&self) -> &Bank<i16> {
        &self.holding_registers
    }

    pub fn input_registers(&self) -> &Bank<i16> {
        &self.input_registers
    }

    /// Raw slot value. Bits read as 0/1, registers as their 16-bit pattern.
    pub fn get(&self, kind: BankKind, slot: usize) -> u16 {
        match kind {
            BankKind::Coils => self.coils.get(slot) as u16,
            BankKind::DiscreteInputs => self.discrete_inputs.get(slot) as u16,
            BankKind::HoldingRegisters => self.holding_registers.get(slot) as u16,
            BankKind::InputRegisters => self.input_registers.get(slot) as u16,
        }
    }

    /// Any non-zero value sets a bit.
    pub fn set(&self, kind: BankKind, slot: usize, value: u16) {
        match kind {
            BankKind::Coils => self.coils.set(slot, value != 0),
            BankKind::DiscreteInputs => self.discrete_inputs.set(slot, value != 0),
            BankKind::HoldingRegisters => self.holding_registers.set(slot, value as i16),
            BankKind::InputRegisters => self.input_registers.set(slot, value as i16),
        }
    }

    /// Copies `dst.len()` raw slot values starting at `start`.
    pub fn copy_range(&self, kind: BankKind, start: usize, dst: &mut [u16]) -> usize {
        match kind {
            BankKind::Coils | BankKind::DiscreteInputs => {
                let bank = if kind == BankKind::Coils {
                    &self.coils
                } else {
                    &self.discrete_inputs
                };
                let mut bits = vec![false; dst.len()];
                let count = bank.copy_range(start, &mut bits);
                for (value, bit) in dst.iter_mut().zip(bits.iter()).take(count) {
                    *value = *bit as u16;
                }
                count
            }
            BankKind::HoldingRegisters | BankKind::InputRegisters => {
                let bank = if kind == BankKind::HoldingRegisters {
                    &self.holding_registers
                } else {
                    &self.input_registers
                };
                let mut words = vec![0i16; dst.len()];
                let count = bank.copy_range(start, &mut words);
                for (value, word) in dst.iter_mut().zip(words.iter()).take(count) {
                    *value = *word as u16;
                }
                count
            }
        }
    }

    /// Stores `value` so that a master reading two registers at protocol
    /// address `address` decodes it back: low word at `address`, high word
    /// at `address + 1`. Both halves are written under one lock.
    pub fn set_holding_float(&self, address: u16, value: f32) {
        let bits = value.to_bits();
        let low = bits as u16 as i16;
        let high = (bits >> 16) as u16 as i16;
        let slot = address as usize + 1;
        self.holding_registers.with(|slots| {
            if slot + 1 < slots.len() {
                slots[slot + 1] = high;
                slots[slot] = low;
            }
        });
    }
}
