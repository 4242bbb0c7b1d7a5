//! The registered methods of the class.
//!
//! Each position moves through at most one transition: unset to written (by
//! write) or unset to invalidated (by fill). Both terminal states are
//! stable. fill of an invalidated position re-reports ok so the sequencer
//! can retry it safely; write of any terminal position reports read_only.
//! The epoch guard runs before any state is inspected or disclosed.

use crate::codec::{self, DecodeError};
use crate::entry::LogEntry;
use crate::{epoch, keys, ops, Status};
use objclass::{MapContext, MethodError};

fn malformed(err: DecodeError) -> MethodError {
    MethodError::Malformed(err.into())
}

/// Seal the object at a new epoch, refusing all lower-epoch mutations from
/// here on. The only method which does not consult the guard: it is the one
/// that updates the guarded value.
pub fn seal(
    ctx: &mut dyn MapContext,
    input: &[u8],
    _out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let op = ops::SealOp::decode(input).map_err(malformed)?;

    if let Some(stored) = ctx.get(keys::EPOCH)? {
        let stored =
            codec::decode_u64(&stored).map_err(|_| MethodError::Corrupt(keys::EPOCH.to_string()))?;
        if op.epoch <= stored {
            tracing::debug!(epoch = op.epoch, stored, "seal refused: epochs move strictly forward");
            return Ok(Status::InvalidEpoch.into());
        }
    }

    ctx.set(keys::EPOCH, &codec::encode_u64(op.epoch))?;
    Ok(Status::Ok.into())
}

/// Write data into an unset position.
pub fn write(
    ctx: &mut dyn MapContext,
    input: &[u8],
    _out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let op = ops::WriteOp::decode(input).map_err(malformed)?;
    if let Some(status) = epoch::check(ctx, op.epoch)? {
        return Ok(status.into());
    }

    let key = keys::position(op.position);
    if ctx.get(&key)?.is_some() {
        // Terminal either way. The stored entry is not inspected: even an
        // undecodable value pins its position against overwrite.
        return Ok(Status::ReadOnly.into());
    }

    let mut buf = Vec::new();
    LogEntry::written(op.data).encode(&mut buf);
    ctx.set(&key, &buf)?;

    update_max_position(ctx, op.position)?;
    Ok(Status::Ok.into())
}

// Advance the written high-water mark after an entry insert at `position`.
// fill never calls this.
fn update_max_position(ctx: &mut dyn MapContext, position: u64) -> Result<(), MethodError> {
    let current = match ctx.get(keys::MAX_POSITION)? {
        Some(stored) => Some(
            codec::decode_u64(&stored)
                .map_err(|_| MethodError::Corrupt(keys::MAX_POSITION.to_string()))?,
        ),
        None => None,
    };

    if let Some(current) = current {
        // The position was unset a moment ago, so a tracked maximum equal to
        // it means the index and the tracker disagree.
        if current == position {
            tracing::error!(position, "max_position equals a position just written");
            debug_assert_ne!(current, position);
            return Err(MethodError::Corrupt(keys::MAX_POSITION.to_string()));
        }
        if position < current {
            return Ok(());
        }
    }

    ctx.set(keys::MAX_POSITION, &codec::encode_u64(position))?;
    Ok(())
}

/// Invalidate an unset position so the sequencer can skip it. Idempotent.
pub fn fill(
    ctx: &mut dyn MapContext,
    input: &[u8],
    _out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let op = ops::FillOp::decode(input).map_err(malformed)?;
    if let Some(status) = epoch::check(ctx, op.epoch)? {
        return Ok(status.into());
    }

    let key = keys::position(op.position);
    let stored = match ctx.get(&key)? {
        Some(stored) => stored,
        None => {
            let mut buf = Vec::new();
            LogEntry::filler().encode(&mut buf);
            ctx.set(&key, &buf)?;
            return Ok(Status::Ok.into());
        }
    };

    let entry = LogEntry::decode(&stored).map_err(|_| MethodError::Corrupt(key))?;
    if entry.invalidated() {
        return Ok(Status::Ok.into());
    }
    Ok(Status::ReadOnly.into())
}

/// Read the entry at a position. The reply payload is the stored data, with
/// no additional framing.
pub fn read(
    ctx: &mut dyn MapContext,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let op = ops::ReadOp::decode(input).map_err(malformed)?;
    if let Some(status) = epoch::check(ctx, op.epoch)? {
        return Ok(status.into());
    }

    let key = keys::position(op.position);
    let stored = match ctx.get(&key)? {
        Some(stored) => stored,
        None => return Ok(Status::NotWritten.into()),
    };

    let entry = LogEntry::decode(&stored).map_err(|_| MethodError::Corrupt(key))?;
    if entry.invalidated() {
        return Ok(Status::Invalidated.into());
    }

    out.extend_from_slice(&entry.data);
    Ok(Status::Ok.into())
}

/// Report the largest position holding a written entry.
pub fn max_position(
    ctx: &mut dyn MapContext,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let op = ops::MaxPositionOp::decode(input).map_err(malformed)?;
    if let Some(status) = epoch::check(ctx, op.epoch)? {
        return Ok(status.into());
    }

    let stored = match ctx.get(keys::MAX_POSITION)? {
        Some(stored) => stored,
        // No write has ever completed against this object.
        None => return Err(MethodError::NotFound(keys::MAX_POSITION)),
    };
    let position = codec::decode_u64(&stored)
        .map_err(|_| MethodError::Corrupt(keys::MAX_POSITION.to_string()))?;

    ops::MaxPositionRet { position }.encode(out);
    Ok(Status::Ok.into())
}

/// Report the projection counter. Takes no epoch: the register is a coarse
/// coordination counter for external components, unrelated to sealing.
pub fn get_projection(
    ctx: &mut dyn MapContext,
    _input: &[u8],
    out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let stored = match ctx.get(keys::PROJECTION)? {
        Some(stored) => stored,
        None => return Err(MethodError::NotFound(keys::PROJECTION)),
    };
    let epoch = codec::decode_u64(&stored)
        .map_err(|_| MethodError::Corrupt(keys::PROJECTION.to_string()))?;

    ops::GetProjectionRet { epoch }.encode(out);
    Ok(Status::Ok.into())
}

/// Initialize the projection counter to zero, or bump it by one. Any request
/// payload is ignored; the wire format reserves room for a future
/// projection descriptor.
pub fn set_projection(
    ctx: &mut dyn MapContext,
    _input: &[u8],
    _out: &mut Vec<u8>,
) -> Result<i32, MethodError> {
    let next = match ctx.get(keys::PROJECTION)? {
        Some(stored) => {
            codec::decode_u64(&stored)
                .map_err(|_| MethodError::Corrupt(keys::PROJECTION.to_string()))?
                + 1
        }
        None => 0,
    };

    ctx.set(keys::PROJECTION, &codec::encode_u64(next))?;
    Ok(Status::Ok.into())
}
