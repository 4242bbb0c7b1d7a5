//! Typed request and reply structures of the class, with their wire codecs.
//!
//! Requests for get_projection and set_projection are empty payloads and
//! have no structure here. set_projection's wire format reserves room for a
//! future descriptor argument; the class ignores whatever is sent today.

use crate::codec::{self, DecodeError, Frame};
use bytes::BufMut;

// Structure & compat versions of every operation structure below.
const VERSION: u8 = 1;
const COMPAT: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealOp {
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    pub epoch: u64,
    pub position: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOp {
    pub epoch: u64,
    pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOp {
    pub epoch: u64,
    pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxPositionOp {
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxPositionRet {
    pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProjectionRet {
    pub epoch: u64,
}

impl SealOp {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| out.put_u64_le(self.epoch));
    }

    pub fn decode(input: &[u8]) -> Result<SealOp, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(SealOp {
            epoch: frame.get_u64()?,
        })
    }
}

impl WriteOp {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| {
            out.put_u64_le(self.epoch);
            out.put_u64_le(self.position);
            codec::put_bytes(out, &self.data);
        });
    }

    pub fn decode(input: &[u8]) -> Result<WriteOp, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(WriteOp {
            epoch: frame.get_u64()?,
            position: frame.get_u64()?,
            data: frame.get_bytes()?.to_vec(),
        })
    }
}

impl FillOp {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| {
            out.put_u64_le(self.epoch);
            out.put_u64_le(self.position);
        });
    }

    pub fn decode(input: &[u8]) -> Result<FillOp, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(FillOp {
            epoch: frame.get_u64()?,
            position: frame.get_u64()?,
        })
    }
}

impl ReadOp {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| {
            out.put_u64_le(self.epoch);
            out.put_u64_le(self.position);
        });
    }

    pub fn decode(input: &[u8]) -> Result<ReadOp, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(ReadOp {
            epoch: frame.get_u64()?,
            position: frame.get_u64()?,
        })
    }
}

impl MaxPositionOp {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| out.put_u64_le(self.epoch));
    }

    pub fn decode(input: &[u8]) -> Result<MaxPositionOp, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(MaxPositionOp {
            epoch: frame.get_u64()?,
        })
    }
}

impl MaxPositionRet {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| out.put_u64_le(self.position));
    }

    pub fn decode(input: &[u8]) -> Result<MaxPositionRet, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(MaxPositionRet {
            position: frame.get_u64()?,
        })
    }
}

impl GetProjectionRet {
    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| out.put_u64_le(self.epoch));
    }

    pub fn decode(input: &[u8]) -> Result<GetProjectionRet, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(GetProjectionRet {
            epoch: frame.get_u64()?,
        })
    }
}
