//! Modbus frame adapter for the memory map
//!
//! rmodbus parses the request and encodes the response. Values move between
//! the [`MemoryMap`] and a scratch rmodbus storage around that, so the storage
//! only ever holds the registers of the current request.

use anyhow::{anyhow, bail, Result};
use rmodbus::{
    consts::ModbusFunction,
    server::{context::ModbusContext, storage::ModbusStorageSmall, ModbusFrame},
    ModbusProto,
};

use crate::{
    area::{MemoryAreaError, MemoryType},
    map::MemoryMap,
};

const ILLEGAL_FUNCTION: u8 = 0x01;
const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
const SERVER_DEVICE_FAILURE: u8 = 0x04;
const SERVER_DEVICE_BUSY: u8 = 0x06;

fn exception_code(err: &MemoryAreaError) -> u8 {
    match err {
        MemoryAreaError::IllegalAddress { .. } | MemoryAreaError::ReadOnly => ILLEGAL_DATA_ADDRESS,
        MemoryAreaError::Configuration(_) => SERVER_DEVICE_FAILURE,
        MemoryAreaError::InvalidState => SERVER_DEVICE_BUSY,
    }
}

/// Modbus RTU CRC16 (polynomial 0xA001, initial value 0xFFFF)
fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, byte| {
        (0..8).fold(crc ^ u16::from(*byte), |crc, _| {
            if crc & 1 != 0 {
                (crc >> 1) ^ 0xA001
            } else {
                crc >> 1
            }
        })
    })
}

/// Build an exception response echoing the addressing part of `request`
pub fn exception_response(proto: ModbusProto, request: &[u8], code: u8) -> Result<Vec<u8>> {
    match proto {
        ModbusProto::Rtu => {
            let [unit_id, function, ..] = request else {
                bail!("RTU request too short for an exception response");
            };
            let mut response = vec![*unit_id, function | 0x80, code];
            let crc = crc16(&response);
            response.extend_from_slice(&crc.to_le_bytes());
            Ok(response)
        }
        ModbusProto::TcpUdp => {
            if request.len() < 8 {
                bail!("TCP request too short for an exception response");
            }
            let mut response = request[..4].to_vec();
            response.extend_from_slice(&3u16.to_be_bytes());
            response.extend_from_slice(&[request[6], request[7] | 0x80, code]);
            Ok(response)
        }
        _ => bail!("Unsupported Modbus framing for exception responses"),
    }
}

fn to_bool(value: u16) -> bool {
    value != 0
}

fn read_into_context(
    map: &MemoryMap,
    func: ModbusFunction,
    reg: u16,
    count: u16,
    context: &mut ModbusStorageSmall,
) -> Result<std::result::Result<(), MemoryAreaError>> {
    let filled = match func {
        ModbusFunction::GetCoils | ModbusFunction::GetDiscretes => {
            let memory_type = if matches!(func, ModbusFunction::GetCoils) {
                MemoryType::Coils
            } else {
                MemoryType::DiscreteInputs
            };
            map.read_bits(memory_type, reg, count).map(|bits| {
                bits.into_iter()
                    .map(u16::from)
                    .collect::<Vec<_>>()
            })
        }
        ModbusFunction::GetHoldings => map.read_registers(MemoryType::HoldingRegisters, reg, count),
        ModbusFunction::GetInputs => map.read_registers(MemoryType::InputRegisters, reg, count),
        _ => bail!("Not a read function: {func:?}"),
    };
    let values = match filled {
        Ok(values) => values,
        Err(err) => return Ok(Err(err)),
    };

    for (address, value) in (reg..).zip(values) {
        match func {
            ModbusFunction::GetCoils => context.set_coil(address, to_bool(value))?,
            ModbusFunction::GetDiscretes => context.set_discrete(address, to_bool(value))?,
            ModbusFunction::GetHoldings => context.set_holding(address, value)?,
            _ => context.set_input(address, value)?,
        }
    }
    Ok(Ok(()))
}

fn write_from_context(
    map: &MemoryMap,
    func: ModbusFunction,
    reg: u16,
    count: u16,
    context: &ModbusStorageSmall,
) -> Result<std::result::Result<(), MemoryAreaError>> {
    Ok(match func {
        ModbusFunction::SetCoil | ModbusFunction::SetCoilsBulk => {
            let values = (reg..reg.saturating_add(count))
                .map(|address| context.get_coil(address))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            map.write_coils(reg, &values)
        }
        ModbusFunction::SetHolding | ModbusFunction::SetHoldingsBulk => {
            let values = (reg..reg.saturating_add(count))
                .map(|address| context.get_holding(address))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            map.write_registers(reg, &values)
        }
        _ => bail!("Not a write function: {func:?}"),
    })
}

/// Handle one Modbus request against `map`
///
/// Returns the encoded response, or `None` when the request needs none (another
/// unit id, broadcast).
pub fn process_frame(
    map: &MemoryMap,
    unit_id: u8,
    proto: ModbusProto,
    request: &[u8],
) -> Result<Option<Vec<u8>>> {
    let mut response = Vec::new();
    let mut frame = ModbusFrame::new(unit_id, request, proto, &mut response);
    frame.parse()?;

    if !frame.processing_required {
        if frame.response_required {
            frame.finalize_response()?;
            return Ok(Some(frame.response.clone()));
        }
        return Ok(None);
    }

    let func = frame.func;
    let reg = frame.reg;
    let count = match func {
        ModbusFunction::SetCoil | ModbusFunction::SetHolding => 1,
        _ => frame.count,
    };
    log::debug!("Modbus request {func:?} at {reg} ({count} items)");

    let mut context = ModbusStorageSmall::new();
    let outcome = match func {
        ModbusFunction::GetCoils
        | ModbusFunction::GetDiscretes
        | ModbusFunction::GetHoldings
        | ModbusFunction::GetInputs => {
            let outcome = read_into_context(map, func, reg, count, &mut context)?;
            if outcome.is_ok() {
                frame
                    .process_read(&context)
                    .map_err(|err| anyhow!("Frame processing error: {err:?}"))?;
            }
            outcome
        }
        ModbusFunction::SetCoil
        | ModbusFunction::SetCoilsBulk
        | ModbusFunction::SetHolding
        | ModbusFunction::SetHoldingsBulk => {
            // The scratch storage is smaller than the address space.
            if let Err(err) = frame.process_write(&mut context) {
                log::warn!("Modbus {func:?} at {reg} ({count} items) rejected: {err:?}");
                if !frame.response_required {
                    return Ok(None);
                }
                return exception_response(proto, request, ILLEGAL_DATA_ADDRESS).map(Some);
            }
            write_from_context(map, func, reg, count, &context)?
        }
        #[allow(unreachable_patterns)]
        _ => {
            log::warn!("Unsupported Modbus function: {func:?}");
            if !frame.response_required {
                return Ok(None);
            }
            return exception_response(proto, request, ILLEGAL_FUNCTION).map(Some);
        }
    };

    if !frame.response_required {
        if let Err(err) = outcome {
            log::warn!("Broadcast {func:?} at {reg} failed: {err}");
        }
        return Ok(None);
    }

    match outcome {
        Ok(()) => {
            frame.finalize_response()?;
            Ok(Some(frame.response.clone()))
        }
        Err(err) => {
            log::warn!("Modbus {func:?} at {reg} ({count} items) failed: {err}");
            exception_response(proto, request, exception_code(&err)).map(Some)
        }
    }
}
