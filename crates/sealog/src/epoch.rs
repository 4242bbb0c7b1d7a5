//! The epoch guard: the single point where sealing is enforced.

use crate::{codec, keys, Status};
use objclass::{MapContext, MethodError};

/// Evaluate a request epoch against the object's sealed epoch.
///
/// `Ok(None)` means proceed. A request epoch *newer* than the stored one also
/// proceeds, without advancing the stored epoch: the client is operating
/// under a projection this node has not yet observed, and only seal moves
/// the stored value. An object that has never been sealed refuses all
/// guarded operations.
pub fn check(ctx: &dyn MapContext, epoch: u64) -> Result<Option<Status>, MethodError> {
    let stored = match ctx.get(keys::EPOCH)? {
        Some(stored) => stored,
        None => {
            tracing::debug!("operation refused: object has never been sealed");
            return Err(MethodError::NotFound(keys::EPOCH));
        }
    };

    let stored = codec::decode_u64(&stored).map_err(|err| MethodError::Malformed(err.into()))?;

    if epoch < stored {
        tracing::debug!(epoch, stored, "stale epoch proposed");
        return Ok(Some(Status::StaleEpoch));
    }
    Ok(None)
}
