use super::exception::Code;
use crate::data::prelude::*;

/// Function codes served by the dispatcher.
pub const SUPPORTED_FUNCTIONS: [u8; 9] = [0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0xF, 0x10, 0x17];

/// Request as it was found on the wire. Quantities and values are not range
/// checked here; that is the dispatcher's job since it answers with exceptions.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPdu {
    /// 0x1
    ReadCoils { address: u16, nobjs: u16 },

    /// 0x2
    ReadDiscreteInputs { address: u16, nobjs: u16 },

    /// 0x3
    ReadHoldingRegisters { address: u16, nobjs: u16 },

    /// 0x4
    ReadInputRegisters { address: u16, nobjs: u16 },

    /// 0x5
    WriteSingleCoil { address: u16, value: u16 },

    /// 0x6
    WriteSingleRegister { address: u16, value: u16 },

    /// 0xF
    WriteMultipleCoils {
        address: u16,
        nobjs: u16,
        nbytes: u8,
        data: Data,
    },

    /// 0x10
    WriteMultipleRegisters {
        address: u16,
        nobjs: u16,
        nbytes: u8,
        data: Data,
    },

    /// 0x17
    ReadWriteMultipleRegisters {
        read_address: u16,
        read_nobjs: u16,
        write_address: u16,
        write_nobjs: u16,
        nbytes: u8,
        data: Data,
    },

    /// Function code without a dedicated parser
    Raw { function: u8, data: Data },
}

impl RequestPdu {
    pub fn func(&self) -> u8 {
        match self {
            RequestPdu::ReadCoils { .. } => 0x1,
            RequestPdu::ReadDiscreteInputs { .. } => 0x2,
            RequestPdu::ReadHoldingRegisters { .. } => 0x3,
            RequestPdu::ReadInputRegisters { .. } => 0x4,
            RequestPdu::WriteSingleCoil { .. } => 0x5,
            RequestPdu::WriteSingleRegister { .. } => 0x6,
            RequestPdu::WriteMultipleCoils { .. } => 0xF,
            RequestPdu::WriteMultipleRegisters { .. } => 0x10,
            RequestPdu::ReadWriteMultipleRegisters { .. } => 0x17,
            RequestPdu::Raw { function, .. } => *function,
        }
    }

    /// 0x1
    pub fn read_coils(address: u16, nobjs: u16) -> RequestPdu {
        RequestPdu::ReadCoils { address, nobjs }
    }

    /// 0x3
    pub fn read_holding_registers(address: u16, nobjs: u16) -> RequestPdu {
        RequestPdu::ReadHoldingRegisters { address, nobjs }
    }

    /// 0x5
    pub fn write_single_coil(address: u16, value: u16) -> RequestPdu {
        RequestPdu::WriteSingleCoil { address, value }
    }

    /// 0x6
    pub fn write_single_register(address: u16, value: u16) -> RequestPdu {
        RequestPdu::WriteSingleRegister { address, value }
    }

    /// 0xF
    pub fn write_multiple_coils(address: u16, coils: &[bool]) -> RequestPdu {
        let data = Data::coils(coils);
        RequestPdu::WriteMultipleCoils {
            address,
            nobjs: coils.len() as u16,
            nbytes: data.len() as u8,
            data,
        }
    }

    /// 0x10
    pub fn write_multiple_registers(address: u16, registers: &[u16]) -> RequestPdu {
        let data = Data::registers(registers);
        RequestPdu::WriteMultipleRegisters {
            address,
            nobjs: registers.len() as u16,
            nbytes: data.len() as u8,
            data,
        }
    }

    /// 0x17
    pub fn read_write_multiple_registers(
        read_address: u16,
        read_nobjs: u16,
        write_address: u16,
        registers: &[u16],
    ) -> RequestPdu {
        let data = Data::registers(registers);
        RequestPdu::ReadWriteMultipleRegisters {
            read_address,
            read_nobjs,
            write_address,
            write_nobjs: registers.len() as u16,
            nbytes: data.len() as u8,
            data,
        }
    }

    pub fn raw(function: u8, data: Data) -> RequestPdu {
        RequestPdu::Raw { function, data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePdu {
    /// 0x1
    ReadCoils { nobjs: u16, data: Data },

    /// 0x2
    ReadDiscreteInputs { nobjs: u16, data: Data },

    /// 0x3
    ReadHoldingRegisters { nobjs: u16, data: Data },

    /// 0x4
    ReadInputRegisters { nobjs: u16, data: Data },

    /// 0x5
    WriteSingleCoil { address: u16, value: u16 },

    /// 0x6
    WriteSingleRegister { address: u16, value: u16 },

    /// 0xF
    WriteMultipleCoils { address: u16, nobjs: u16 },

    /// 0x10
    WriteMultipleRegisters { address: u16, nobjs: u16 },

    /// 0x17
    ReadWriteMultipleRegisters { nobjs: u16, data: Data },

    /// `function` is the request's code; the 0x80 flag is added on the wire
    Exception { function: u8, code: Code },
}

impl ResponsePdu {
    pub fn len(&self) -> usize {
        match self {
            ResponsePdu::ReadCoils { data, .. }
            | ResponsePdu::ReadDiscreteInputs { data, .. }
            | ResponsePdu::ReadHoldingRegisters { data, .. }
            | ResponsePdu::ReadInputRegisters { data, .. }
            | ResponsePdu::ReadWriteMultipleRegisters { data, .. } => 2 + data.len(),
            ResponsePdu::WriteSingleCoil { .. }
            | ResponsePdu::WriteSingleRegister { .. }
            | ResponsePdu::WriteMultipleCoils { .. }
            | ResponsePdu::WriteMultipleRegisters { .. } => 5,
            ResponsePdu::Exception { .. } => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn exception_code(&self) -> Option<Code> {
        match self {
            ResponsePdu::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// 0x1
    pub fn read_coils(coils: &[bool]) -> ResponsePdu {
        ResponsePdu::ReadCoils {
            nobjs: coils.len() as u16,
            data: Data::coils(coils),
        }
    }

    /// 0x2
    pub fn read_discrete_inputs(coils: &[bool]) -> ResponsePdu {
        ResponsePdu::ReadDiscreteInputs {
            nobjs: coils.len() as u16,
            data: Data::coils(coils),
        }
    }

    /// 0x3
    pub fn read_holding_registers(registers: &[u16]) -> ResponsePdu {
        ResponsePdu::ReadHoldingRegisters {
            nobjs: registers.len() as u16,
            data: Data::registers(registers),
        }
    }

    /// 0x4
    pub fn read_input_registers(registers: &[u16]) -> ResponsePdu {
        ResponsePdu::ReadInputRegisters {
            nobjs: registers.len() as u16,
            data: Data::registers(registers),
        }
    }

    /// 0x17
    pub fn read_write_multiple_registers(registers: &[u16]) -> ResponsePdu {
        ResponsePdu::ReadWriteMultipleRegisters {
            nobjs: registers.len() as u16,
            data: Data::registers(registers),
        }
    }

    pub fn exception(function: u8, code: Code) -> ResponsePdu {
        ResponsePdu::Exception { function, code }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_func() {
        assert_eq!(RequestPdu::read_coils(0, 1).func(), 0x1);
        assert_eq!(RequestPdu::write_multiple_registers(0, &[1, 2]).func(), 0x10);
        assert_eq!(
            RequestPdu::read_write_multiple_registers(0, 1, 0, &[1]).func(),
            0x17
        );
        assert_eq!(RequestPdu::raw(0x2B, Data::raw(&[0xE])).func(), 0x2B);
    }

    #[test]
    fn response_len() {
        let pdu = ResponsePdu::read_coils(&[true; 37]);
        assert_eq!(pdu.len(), 7);
        let pdu = ResponsePdu::read_holding_registers(&[1, 2, 3]);
        assert_eq!(pdu.len(), 8);
        let pdu = ResponsePdu::exception(0x3, Code::IllegalFunction);
        assert_eq!(pdu.len(), 2);
        assert_eq!(pdu.exception_code(), Some(Code::IllegalFunction));
    }
}
