use super::error::Error;
use crate::codec::crc::crc16_range;
use byteorder::{BigEndian, ByteOrder};
use rand::Rng;

/// Values returned by one read, unused entries are 0.0.
pub const FLOATS_PER_READ: usize = 40;
/// MBAP header and FC3 PDU. Two more bytes hold a CRC that is never sent.
pub const REQUEST_SIZE: usize = 12;
pub const REQUEST_BUFFER_SIZE: usize = REQUEST_SIZE + 2;

const EXCEPTION_FC3: u8 = 0x83;
const FIRST_VALUE: usize = 9;

/// Builds a read holding registers request.
pub fn read_request(id: u16, unit_id: u8, start: u16, quantity: u16) -> [u8; REQUEST_BUFFER_SIZE] {
    let mut frame = [0u8; REQUEST_BUFFER_SIZE];
    BigEndian::write_u16(&mut frame[0..2], id);
    BigEndian::write_u16(&mut frame[2..4], 0);
    BigEndian::write_u16(&mut frame[4..6], 6);
    frame[6] = unit_id;
    frame[7] = 0x03;
    BigEndian::write_u16(&mut frame[8..10], start);
    BigEndian::write_u16(&mut frame[10..12], quantity);

    let crc = crc16_range(&frame, 6, 6).to_le_bytes();
    frame[12..].copy_from_slice(&crc);
    frame
}

/// A response that does not echo the request id is stale or belongs to
/// another master.
pub fn check_transaction_id(response: &[u8], id: u16) -> Result<(), Error> {
    match response.get(0..2).map(BigEndian::read_u16) {
        Some(received) if received == id => Ok(()),
        Some(received) => Err(Error::Modbus(format!(
            "transaction id mismatch: sent {id}, received {received}"
        ))),
        None => Err(Error::Modbus("response is too short".to_owned())),
    }
}

/// Maps an FC3 exception response to an error. Other responses pass.
pub fn check_exception(response: &[u8]) -> Result<(), Error> {
    if response.get(7) != Some(&EXCEPTION_FC3) {
        return Ok(());
    }
    match response.get(8) {
        Some(1) => Err(Error::FunctionCodeNotSupported),
        Some(2) => Err(Error::StartingAddressInvalid),
        Some(3) => Err(Error::QuantityInvalid),
        Some(4) => Err(Error::Modbus("slave device failure".to_owned())),
        _ => Ok(()),
    }
}

/// Each pair of registers holds one float: the first register is the low
/// half, the second one the high half, both big-endian on the wire.
pub fn decode_floats(response: &[u8]) -> Vec<f32> {
    let mut values = vec![0.0f32; FLOATS_PER_READ];
    let end = response.len().saturating_sub(4);
    for (value, i) in values.iter_mut().zip((FIRST_VALUE..end).step_by(4)) {
        let low = BigEndian::read_u16(&response[i..i + 2]) as u32;
        let high = BigEndian::read_u16(&response[i + 2..i + 4]) as u32;
        *value = f32::from_bits((high << 16) | low);
    }
    values
}

/// Random values in [20, 27) rounded to one decimal.
pub fn demo_values() -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..FLOATS_PER_READ)
        .map(|_| {
            let value: f64 = rng.gen_range(20.0..27.0);
            ((value * 10.0).round() / 10.0) as f32
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_frame() {
        let frame = read_request(1, 1, 0, 2);
        assert_eq!(
            frame,
            [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]
        );

        let frame = read_request(0xABCD, 0x11, 0x0102, 125);
        assert_eq!(&frame[..REQUEST_SIZE], &[0xAB, 0xCD, 0, 0, 0, 6, 0x11, 3, 1, 2, 0, 125]);
    }

    #[test]
    fn exceptions() {
        let mut response = [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x01];
        assert!(matches!(check_exception(&response), Err(Error::FunctionCodeNotSupported)));
        response[8] = 2;
        assert!(matches!(check_exception(&response), Err(Error::StartingAddressInvalid)));
        response[8] = 3;
        assert!(matches!(check_exception(&response), Err(Error::QuantityInvalid)));
        response[8] = 4;
        assert!(matches!(check_exception(&response), Err(Error::Modbus(_))));
        response[8] = 9;
        assert!(check_exception(&response).is_ok());
        assert!(check_exception(&response[..8]).is_ok());
        assert!(check_exception(&[]).is_ok());

        let normal = [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x03, 0x00];
        assert!(check_exception(&normal).is_ok());
    }

    #[test]
    fn floats() {
        let mut response = vec![0u8; 256];
        let header = [0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x03, 0x08];
        response[..9].copy_from_slice(&header);
        // 3.14 = 0x4048F5C3, -1.5 = 0xBFC00000
        response[9..17].copy_from_slice(&[0xF5, 0xC3, 0x40, 0x48, 0x00, 0x00, 0xBF, 0xC0]);

        let values = decode_floats(&response);
        assert_eq!(values.len(), FLOATS_PER_READ);
        assert_eq!(values[0], 3.14);
        assert_eq!(values[1], -1.5);
        assert!(values[2..].iter().all(|value| *value == 0.0));
    }

    #[test]
    fn transaction_id() {
        let response = [0x12, 0x34, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02];
        assert!(check_transaction_id(&response, 0x1234).is_ok());
        assert!(matches!(check_transaction_id(&response, 0x1235), Err(Error::Modbus(_))));
        assert!(matches!(check_transaction_id(&[0x12], 0x12), Err(Error::Modbus(_))));
    }

    #[test]
    fn floats_short_response() {
        // the last register pair of a datagram is never reached
        let response = [0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0xF5, 0xC3, 0x40, 0x48];
        assert!(decode_floats(&response).iter().all(|value| *value == 0.0));
        assert!(decode_floats(&[]).iter().all(|value| *value == 0.0));

        let mut response = response.to_vec();
        response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(decode_floats(&response)[0], 3.14);
    }

    #[test]
    fn demo() {
        let values = demo_values();
        assert_eq!(values.len(), FLOATS_PER_READ);
        for value in values {
            assert!((20.0..=27.0).contains(&value));
            let tenths = value * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-3);
        }
    }
}
