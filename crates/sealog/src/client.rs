//! Client-side construction of request payloads and parsing of replies.
//!
//! These helpers are the only supported way to build the opaque byte
//! payloads handed to the host for execution against a log object. They are
//! deliberately free of any host or transport types.

use crate::codec::DecodeError;
use crate::ops;

pub fn seal(epoch: u64) -> Vec<u8> {
    let mut out = Vec::new();
    ops::SealOp { epoch }.encode(&mut out);
    out
}

pub fn write(epoch: u64, position: u64, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ops::WriteOp {
        epoch,
        position,
        data: data.to_vec(),
    }
    .encode(&mut out);
    out
}

pub fn fill(epoch: u64, position: u64) -> Vec<u8> {
    let mut out = Vec::new();
    ops::FillOp { epoch, position }.encode(&mut out);
    out
}

pub fn read(epoch: u64, position: u64) -> Vec<u8> {
    let mut out = Vec::new();
    ops::ReadOp { epoch, position }.encode(&mut out);
    out
}

pub fn max_position(epoch: u64) -> Vec<u8> {
    let mut out = Vec::new();
    ops::MaxPositionOp { epoch }.encode(&mut out);
    out
}

/// get_projection sends no payload.
pub fn get_projection() -> Vec<u8> {
    Vec::new()
}

/// set_projection sends no payload today. The server ignores whatever is
/// sent, so older payload-bearing clients remain compatible.
pub fn set_projection() -> Vec<u8> {
    Vec::new()
}

/// Parse the reply of a successful max_position request.
pub fn max_position_reply(reply: &[u8]) -> Result<u64, DecodeError> {
    Ok(ops::MaxPositionRet::decode(reply)?.position)
}

/// Parse the reply of a successful get_projection request.
pub fn get_projection_reply(reply: &[u8]) -> Result<u64, DecodeError> {
    Ok(ops::GetProjectionRet::decode(reply)?.epoch)
}
