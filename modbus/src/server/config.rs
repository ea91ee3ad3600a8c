use crate::frame::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Set of function codes, one bit per entry of `SUPPORTED_FUNCTIONS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionSet {
    mask: u16,
}

fn bit_of(function: u8) -> Option<u16> {
    SUPPORTED_FUNCTIONS
        .iter()
        .position(|f| *f == function)
        .map(|pos| 1 << pos)
}

impl FunctionSet {
    pub fn empty() -> FunctionSet {
        FunctionSet::default()
    }

    /// Returns false for codes the server does not implement.
    pub fn insert(&mut self, function: u8) -> bool {
        match bit_of(function) {
            Some(bit) => {
                self.mask |= bit;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, function: u8) {
        if let Some(bit) = bit_of(function) {
            self.mask &= !bit;
        }
    }

    pub fn contains(&self, function: u8) -> bool {
        bit_of(function).map_or(false, |bit| self.mask & bit != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        SUPPORTED_FUNCTIONS
            .iter()
            .copied()
            .filter(move |f| self.contains(*f))
    }
}

impl FromStr for FunctionSet {
    type Err = String;

    /// Comma separated decimal codes, e.g. `3,16`. Empty input is an empty set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = FunctionSet::empty();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let function = u8::from_str(item).map_err(|_| format!("invalid function code {item}"))?;
            if !set.insert(function) {
                return Err(format!("unsupported function code {function}"));
            }
        }
        Ok(set)
    }
}

impl fmt::Display for FunctionSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let codes: Vec<String> = self.iter().map(|code| code.to_string()).collect();
        write!(f, "{}", codes.join(","))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub unit_id: u8,
    /// Function codes answered with "illegal function"
    pub disabled: FunctionSet,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            unit_id: 1,
            disabled: FunctionSet::empty(),
        }
    }
}

impl ServerConfig {
    pub fn is_enabled(&self, function: u8) -> bool {
        SUPPORTED_FUNCTIONS.contains(&function) && !self.disabled.contains(function)
    }

    /// Requests for other units are ignored. 0 addresses every unit.
    pub fn accepts_unit(&self, unit_id: u8) -> bool {
        unit_id == self.unit_id || unit_id == 0
    }
}
