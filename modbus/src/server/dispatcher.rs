use super::config::ServerConfig;
use super::events::{Notifier, ServerEvent};
use crate::data::checks::*;
use crate::data::helpers::get_coils_len;
use crate::data::prelude::*;
use crate::frame::prelude::*;
use crate::store::Store;
use log::debug;
use std::sync::Arc;

/// Why a request did not get a normal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answered with an exception response
    Exception(Code),
    /// Dropped without a response
    Malformed,
}

impl From<Code> for Fault {
    fn from(code: Code) -> Fault {
        Fault::Exception(code)
    }
}

/// Quantity is checked first, the address range second. When both fail the
/// address exception is the one reported.
fn validate(count_ok: bool, range_ok: bool) -> Result<(), Fault> {
    let mut code = None;
    if !count_ok {
        code = Some(Code::IllegalDataValue);
    }
    if !range_ok {
        code = Some(Code::IllegalDataAddress);
    }
    code.map_or(Ok(()), |code| Err(Fault::Exception(code)))
}

fn slot(address: u16) -> usize {
    address as usize + 1
}

fn to_words(registers: &[i16]) -> Vec<u16> {
    registers.iter().map(|value| *value as u16).collect()
}

fn payload_registers(data: &Data, nobjs: u16) -> Result<Vec<i16>, Fault> {
    (0..nobjs as usize)
        .map(|idx| data.get_u16(idx).map(|value| value as i16))
        .collect::<Option<Vec<i16>>>()
        .ok_or(Fault::Malformed)
}

/// Executes decoded requests against the store. Not reentrant; the server
/// runtime feeds it one request at a time.
pub struct Dispatcher {
    config: ServerConfig,
    store: Arc<Store>,
    notifier: Notifier,
}

impl Dispatcher {
    pub fn new(config: ServerConfig, store: Arc<Store>, notifier: Notifier) -> Dispatcher {
        Dispatcher {
            config,
            store,
            notifier,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// `None` means the request is dropped silently.
    pub fn process(&self, request: &RequestFrame) -> Option<ResponseFrame> {
        if !self.config.accepts_unit(request.slave) {
            debug!("drop request for unit {}", request.slave);
            return None;
        }

        let function = request.pdu.func();
        if !self.config.is_enabled(function) {
            debug!("function {:#04x} is not available", function);
            let pdu = ResponsePdu::exception(function, Code::IllegalFunction);
            return Some(ResponseFrame::from_parts(request.id, request.slave, pdu));
        }

        let pdu = match self.handle(&request.pdu) {
            Ok(pdu) => pdu,
            Err(Fault::Exception(code)) => {
                debug!("function {:#04x} failed with {:?}", function, code);
                ResponsePdu::exception(function, code)
            }
            Err(Fault::Malformed) => {
                debug!("drop malformed function {:#04x} request", function);
                return None;
            }
        };
        Some(ResponseFrame::from_parts(
            request.id,
            self.config.unit_id,
            pdu,
        ))
    }

    pub fn handle(&self, pdu: &RequestPdu) -> Result<ResponsePdu, Fault> {
        match pdu {
            RequestPdu::ReadCoils { address, nobjs } => {
                let bits = self.read_bits(*address, *nobjs, true)?;
                Ok(ResponsePdu::read_coils(&bits))
            }
            RequestPdu::ReadDiscreteInputs { address, nobjs } => {
                let bits = self.read_bits(*address, *nobjs, false)?;
                Ok(ResponsePdu::read_discrete_inputs(&bits))
            }
            RequestPdu::ReadHoldingRegisters { address, nobjs } => {
                let words = self.read_registers(*address, *nobjs, true)?;
                Ok(ResponsePdu::read_holding_registers(&words))
            }
            RequestPdu::ReadInputRegisters { address, nobjs } => {
                let words = self.read_registers(*address, *nobjs, false)?;
                Ok(ResponsePdu::read_input_registers(&words))
            }
            RequestPdu::WriteSingleCoil { address, value } => {
                self.write_single_coil(*address, *value)
            }
            RequestPdu::WriteSingleRegister { address, value } => {
                self.write_single_register(*address, *value)
            }
            RequestPdu::WriteMultipleCoils {
                address,
                nobjs,
                data,
                ..
            } => self.write_multiple_coils(*address, *nobjs, data),
            RequestPdu::WriteMultipleRegisters {
                address,
                nobjs,
                data,
                ..
            } => self.write_multiple_registers(*address, *nobjs, data),
            RequestPdu::ReadWriteMultipleRegisters {
                read_address,
                read_nobjs,
                write_address,
                write_nobjs,
                nbytes,
                data,
            } => self.read_write_multiple_registers(
                (*read_address, *read_nobjs),
                (*write_address, *write_nobjs),
                *nbytes,
                data,
            ),
            RequestPdu::Raw { .. } => Err(Code::IllegalFunction.into()),
        }
    }

    fn read_bits(&self, address: u16, nobjs: u16, coils: bool) -> Result<Vec<bool>, Fault> {
        validate(check_read_coils_count(nobjs), check_range(address, nobjs))?;
        let bank = if coils {
            self.store.coils()
        } else {
            self.store.discrete_inputs()
        };
        let mut bits = vec![false; nobjs as usize];
        bank.copy_range(slot(address), &mut bits);
        Ok(bits)
    }

    fn read_registers(&self, address: u16, nobjs: u16, holding: bool) -> Result<Vec<u16>, Fault> {
        validate(check_read_registers_count(nobjs), check_range(address, nobjs))?;
        let bank = if holding {
            self.store.holding_registers()
        } else {
            self.store.input_registers()
        };
        let mut registers = vec![0i16; nobjs as usize];
        bank.copy_range(slot(address), &mut registers);
        Ok(to_words(&registers))
    }

    fn write_single_coil(&self, address: u16, value: u16) -> Result<ResponsePdu, Fault> {
        validate(check_coil_value(value), check_range(address, 0))?;
        self.store.coils().set(slot(address), value == COIL_ON);
        self.notifier.notify(ServerEvent::CoilsChanged {
            address: slot(address),
            count: 1,
        });
        Ok(ResponsePdu::WriteSingleCoil { address, value })
    }

    fn write_single_register(&self, address: u16, value: u16) -> Result<ResponsePdu, Fault> {
        // any u16 is a valid register value
        validate(true, check_range(address, 0))?;
        self.store
            .holding_registers()
            .set(slot(address), value as i16);
        self.notifier.notify(ServerEvent::HoldingRegistersChanged {
            address: slot(address),
            count: 1,
        });
        Ok(ResponsePdu::WriteSingleRegister { address, value })
    }

    fn write_multiple_coils(
        &self,
        address: u16,
        nobjs: u16,
        data: &Data,
    ) -> Result<ResponsePdu, Fault> {
        validate(check_write_count(nobjs), check_range(address, nobjs))?;
        if data.len() < get_coils_len(nobjs) {
            return Err(Fault::Malformed);
        }

        let bits = (0..nobjs as usize)
            .map(|idx| data.get_word_bit(idx))
            .collect::<Option<Vec<bool>>>()
            .ok_or(Fault::Malformed)?;
        self.store.coils().write_range(slot(address), &bits);
        self.notifier.notify(ServerEvent::CoilsChanged {
            address: slot(address),
            count: nobjs as usize,
        });
        Ok(ResponsePdu::WriteMultipleCoils { address, nobjs })
    }

    fn write_multiple_registers(
        &self,
        address: u16,
        nobjs: u16,
        data: &Data,
    ) -> Result<ResponsePdu, Fault> {
        validate(check_write_count(nobjs), check_range(address, nobjs))?;
        let registers = payload_registers(data, nobjs)?;
        self.store
            .holding_registers()
            .write_range(slot(address), &registers);
        self.notifier.notify(ServerEvent::HoldingRegistersChanged {
            address: slot(address),
            count: nobjs as usize,
        });
        Ok(ResponsePdu::WriteMultipleRegisters { address, nobjs })
    }

    /// Writes first, then reads, under one lock of the holding bank.
    fn read_write_multiple_registers(
        &self,
        (read_address, read_nobjs): (u16, u16),
        (write_address, write_nobjs): (u16, u16),
        nbytes: u8,
        data: &Data,
    ) -> Result<ResponsePdu, Fault> {
        let count_ok = check_read_registers_count(read_nobjs)
            && check_rw_write_count(write_nobjs)
            && nbytes as usize == write_nobjs as usize * 2;
        let range_ok =
            check_range(read_address, read_nobjs) && check_range(write_address, write_nobjs);
        validate(count_ok, range_ok)?;

        let registers = payload_registers(data, write_nobjs)?;
        let read_slot = slot(read_address);
        let write_slot = slot(write_address);
        let words = self.store.holding_registers().with(|slots| {
            slots[write_slot..write_slot + registers.len()].copy_from_slice(&registers);
            to_words(&slots[read_slot..read_slot + read_nobjs as usize])
        });

        self.notifier.notify(ServerEvent::HoldingRegistersChanged {
            address: write_slot,
            count: write_nobjs as usize,
        });
        Ok(ResponsePdu::read_write_multiple_registers(&words))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::BankKind;
    use tokio::sync::broadcast::error::TryRecvError;

    fn dispatcher(config: ServerConfig) -> (Dispatcher, Arc<Store>, Notifier) {
        let store = Arc::new(Store::new());
        let notifier = Notifier::new();
        (
            Dispatcher::new(config, store.clone(), notifier.clone()),
            store,
            notifier,
        )
    }

    fn request(pdu: RequestPdu) -> RequestFrame {
        RequestFrame::from_parts(0x1234, 1, pdu)
    }

    fn exception_of(response: Option<ResponseFrame>) -> Option<Code> {
        response.and_then(|frame| frame.pdu.exception_code())
    }

    #[test]
    fn read_holding_registers_bounds() {
        let (dispatcher, store, _) = dispatcher(ServerConfig::default());

        let pdu = RequestPdu::read_holding_registers(0, 0);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));

        let pdu = RequestPdu::read_holding_registers(0, 126);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));

        let pdu = RequestPdu::read_holding_registers(65535 - 10, 10);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataAddress));

        store.set(BankKind::HoldingRegisters, 1, 7);
        store.set(BankKind::HoldingRegisters, 125, 0xFFFF);
        let pdu = RequestPdu::read_holding_registers(0, 125);
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(response.id, 0x1234);
        assert_eq!(response.slave, 1);
        match response.pdu {
            ResponsePdu::ReadHoldingRegisters { nobjs, data } => {
                assert_eq!(nobjs, 125);
                assert_eq!(data.registers_count(), 125);
                assert_eq!(data.get_u16(0), Some(7));
                assert_eq!(data.get_u16(124), Some(0xFFFF));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn address_exception_wins() {
        let (dispatcher, _, _) = dispatcher(ServerConfig::default());
        let pdu = RequestPdu::read_holding_registers(65534, 126);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataAddress));
    }

    #[test]
    fn read_bits() {
        let (dispatcher, store, _) = dispatcher(ServerConfig::default());
        store.set(BankKind::Coils, 1, 1);
        store.set(BankKind::Coils, 3, 1);
        store.set(BankKind::DiscreteInputs, 2, 1);

        let response = dispatcher
            .process(&request(RequestPdu::read_coils(0, 10)))
            .unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::read_coils(&[
                true, false, true, false, false, false, false, false, false, false
            ])
        );

        let pdu = RequestPdu::ReadDiscreteInputs {
            address: 1,
            nobjs: 1,
        };
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(response.pdu, ResponsePdu::read_discrete_inputs(&[true]));

        let response = dispatcher.process(&request(RequestPdu::read_coils(0, 2001)));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));
    }

    #[test]
    fn read_input_registers() {
        let (dispatcher, store, _) = dispatcher(ServerConfig::default());
        store.set(BankKind::InputRegisters, 11, 0xABCD);
        let pdu = RequestPdu::ReadInputRegisters {
            address: 10,
            nobjs: 1,
        };
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(response.pdu, ResponsePdu::read_input_registers(&[0xABCD]));
    }

    #[test]
    fn write_single_coil() {
        let (dispatcher, store, notifier) = dispatcher(ServerConfig::default());
        let mut events = notifier.subscribe();

        let pdu = RequestPdu::write_single_coil(4, 0x1234);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        let pdu = RequestPdu::write_single_coil(4, COIL_ON);
        let response = dispatcher.process(&request(pdu.clone())).unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::WriteSingleCoil {
                address: 4,
                value: COIL_ON
            }
        );
        assert_eq!(store.get(BankKind::Coils, 5), 1);
        assert_eq!(
            events.try_recv().unwrap(),
            ServerEvent::CoilsChanged {
                address: 5,
                count: 1
            }
        );

        let pdu = RequestPdu::write_single_coil(4, COIL_OFF);
        dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(store.get(BankKind::Coils, 5), 0);
    }

    #[test]
    fn write_single_register() {
        let (dispatcher, store, notifier) = dispatcher(ServerConfig::default());
        let mut events = notifier.subscribe();
        let pdu = RequestPdu::write_single_register(0, 0x8001);
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::WriteSingleRegister {
                address: 0,
                value: 0x8001
            }
        );
        assert_eq!(store.get(BankKind::HoldingRegisters, 1), 0x8001);
        assert_eq!(
            events.try_recv().unwrap(),
            ServerEvent::HoldingRegistersChanged {
                address: 1,
                count: 1
            }
        );

        let pdu = RequestPdu::write_single_register(65535, 1);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataAddress));
    }

    #[test]
    fn write_multiple_coils() {
        let (dispatcher, store, notifier) = dispatcher(ServerConfig::default());
        let mut events = notifier.subscribe();
        let coils = [true, false, true, true, false, false, false, false, true, true];
        let pdu = RequestPdu::write_multiple_coils(19, &coils);
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::WriteMultipleCoils {
                address: 19,
                nobjs: 10
            }
        );
        for (idx, coil) in coils.iter().enumerate() {
            assert_eq!(store.get(BankKind::Coils, 20 + idx), *coil as u16);
        }
        assert_eq!(
            events.try_recv().unwrap(),
            ServerEvent::CoilsChanged {
                address: 20,
                count: 10
            }
        );

        let pdu = RequestPdu::WriteMultipleCoils {
            address: 0,
            nobjs: 0x07B1,
            nbytes: 1,
            data: Data::raw(&[0xFF]),
        };
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));
    }

    #[test]
    fn write_multiple_coils_short_payload() {
        let (dispatcher, store, _) = dispatcher(ServerConfig::default());
        let pdu = RequestPdu::WriteMultipleCoils {
            address: 0,
            nobjs: 9,
            nbytes: 1,
            data: Data::raw(&[0xFF]),
        };
        assert!(dispatcher.process(&request(pdu)).is_none());
        assert_eq!(store.get(BankKind::Coils, 1), 0);
    }

    #[test]
    fn write_multiple_registers() {
        let (dispatcher, store, notifier) = dispatcher(ServerConfig::default());
        let mut events = notifier.subscribe();
        let pdu = RequestPdu::write_multiple_registers(100, &[1, 2, 0xFFFF]);
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::WriteMultipleRegisters {
                address: 100,
                nobjs: 3
            }
        );
        assert_eq!(store.get(BankKind::HoldingRegisters, 101), 1);
        assert_eq!(store.get(BankKind::HoldingRegisters, 103), 0xFFFF);
        assert_eq!(
            events.try_recv().unwrap(),
            ServerEvent::HoldingRegistersChanged {
                address: 101,
                count: 3
            }
        );

        let pdu = RequestPdu::WriteMultipleRegisters {
            address: 0,
            nobjs: 3,
            nbytes: 2,
            data: Data::registers(&[5]),
        };
        assert!(dispatcher.process(&request(pdu)).is_none());
        assert_eq!(store.get(BankKind::HoldingRegisters, 1), 0);
    }

    #[test]
    fn read_write_observes_write() {
        let (dispatcher, store, notifier) = dispatcher(ServerConfig::default());
        let mut events = notifier.subscribe();
        store.set(BankKind::HoldingRegisters, 11, 1);

        let pdu = RequestPdu::read_write_multiple_registers(10, 2, 10, &[0x4242]);
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::read_write_multiple_registers(&[0x4242, 0])
        );
        assert_eq!(
            events.try_recv().unwrap(),
            ServerEvent::HoldingRegistersChanged {
                address: 11,
                count: 1
            }
        );
    }

    #[test]
    fn read_write_checks() {
        let (dispatcher, _, _) = dispatcher(ServerConfig::default());

        let pdu = RequestPdu::read_write_multiple_registers(0, 126, 0, &[1]);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));

        let pdu = RequestPdu::ReadWriteMultipleRegisters {
            read_address: 0,
            read_nobjs: 1,
            write_address: 0,
            write_nobjs: 2,
            nbytes: 2,
            data: Data::registers(&[1]),
        };
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataValue));

        let pdu = RequestPdu::read_write_multiple_registers(0, 1, 65534, &[1]);
        let response = dispatcher.process(&request(pdu));
        assert_eq!(exception_of(response), Some(Code::IllegalDataAddress));
    }

    #[test]
    fn disabled_function() {
        let mut config = ServerConfig::default();
        config.disabled.insert(0x3);
        let (dispatcher, _, _) = dispatcher(config);

        let frame = RequestFrame::from_parts(7, 0, RequestPdu::read_holding_registers(0, 1));
        let response = dispatcher.process(&frame).unwrap();
        assert_eq!(response.id, 7);
        assert_eq!(response.slave, 0);
        assert_eq!(
            response.pdu,
            ResponsePdu::exception(0x3, Code::IllegalFunction)
        );

        let response = dispatcher.process(&request(RequestPdu::read_coils(0, 1)));
        assert!(exception_of(response).is_none());
    }

    #[test]
    fn unsupported_function() {
        let (dispatcher, _, _) = dispatcher(ServerConfig::default());
        let pdu = RequestPdu::raw(0x2B, Data::raw(&[0x0E, 0x01, 0x00]));
        let response = dispatcher.process(&request(pdu)).unwrap();
        assert_eq!(
            response.pdu,
            ResponsePdu::exception(0x2B, Code::IllegalFunction)
        );
    }

    #[test]
    fn unit_id() {
        let config = ServerConfig {
            unit_id: 5,
            ..Default::default()
        };
        let (dispatcher, _, _) = dispatcher(config);

        let frame = RequestFrame::from_parts(1, 4, RequestPdu::read_coils(0, 1));
        assert!(dispatcher.process(&frame).is_none());

        let frame = RequestFrame::from_parts(1, 0, RequestPdu::read_coils(0, 1));
        assert_eq!(dispatcher.process(&frame).unwrap().slave, 5);

        let frame = RequestFrame::from_parts(1, 0, RequestPdu::read_coils(0, 0));
        assert_eq!(dispatcher.process(&frame).unwrap().slave, 5);
    }
}
