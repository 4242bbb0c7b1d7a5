//! Randomized sequences of operations over a small position space, checked
//! step-by-step against an in-memory model of the entry state machine, the
//! epoch guard, the max-position tracker, and the projection register.

use objclass::{Registry, Store, NOT_FOUND};
use quickcheck::{quickcheck, Arbitrary, Gen};
use sealog::{client, Status};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Op {
    Seal(u64),
    Write(u64, u64, Vec<u8>),
    Fill(u64, u64),
    Read(u64, u64),
    MaxPosition(u64),
    GetProjection,
    SetProjection,
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Op {
        // Epochs and positions are drawn from small ranges so sequences
        // collide often: stale epochs, refused seals, terminal positions.
        let epoch = u64::from(u8::arbitrary(g) % 6);
        let position = u64::from(u8::arbitrary(g) % 16);

        match u8::arbitrary(g) % 8 {
            0 => Op::Seal(epoch),
            1 | 2 => Op::Write(epoch, position, Vec::<u8>::arbitrary(g)),
            3 => Op::Fill(epoch, position),
            4 => Op::Read(epoch, position),
            5 => Op::MaxPosition(epoch),
            6 => Op::GetProjection,
            _ => Op::SetProjection,
        }
    }
}

/// The model: per-position slots are either absent (unset), written with
/// data, or invalidated.
#[derive(Default)]
struct Model {
    epoch: Option<u64>,
    projection: Option<u64>,
    max: Option<u64>,
    slots: BTreeMap<u64, Option<Vec<u8>>>,
}

impl Model {
    // Status of a guarded mutation or read, before touching any slot.
    fn guard(&self, epoch: u64) -> Option<i32> {
        match self.epoch {
            None => Some(NOT_FOUND),
            Some(stored) if epoch < stored => Some(Status::StaleEpoch as i32),
            Some(_) => None,
        }
    }
}

const OID: &str = "obj";

fn run(store: &Store, ops: Vec<Op>) -> bool {
    let mut model = Model::default();

    for op in ops {
        let ok = match op {
            Op::Seal(epoch) => {
                let reply = store
                    .exec(OID, sealog::CLASS, "seal", &client::seal(epoch))
                    .unwrap();
                let expect = match model.epoch {
                    Some(stored) if epoch <= stored => Status::InvalidEpoch as i32,
                    _ => {
                        model.epoch = Some(epoch);
                        Status::Ok as i32
                    }
                };
                reply.status == expect
            }
            Op::Write(epoch, position, data) => {
                let reply = store
                    .exec(OID, sealog::CLASS, "write", &client::write(epoch, position, &data))
                    .unwrap();
                let expect = match model.guard(epoch) {
                    Some(status) => status,
                    None if model.slots.contains_key(&position) => Status::ReadOnly as i32,
                    None => {
                        model.slots.insert(position, Some(data));
                        model.max = Some(model.max.map_or(position, |max| max.max(position)));
                        Status::Ok as i32
                    }
                };
                reply.status == expect
            }
            Op::Fill(epoch, position) => {
                let reply = store
                    .exec(OID, sealog::CLASS, "fill", &client::fill(epoch, position))
                    .unwrap();
                let expect = match model.guard(epoch) {
                    Some(status) => status,
                    None => match model.slots.get(&position) {
                        Some(Some(_)) => Status::ReadOnly as i32,
                        Some(None) => Status::Ok as i32,
                        None => {
                            model.slots.insert(position, None);
                            Status::Ok as i32
                        }
                    },
                };
                reply.status == expect
            }
            Op::Read(epoch, position) => {
                let reply = store
                    .exec(OID, sealog::CLASS, "read", &client::read(epoch, position))
                    .unwrap();
                match model.guard(epoch) {
                    Some(status) => reply.status == status,
                    None => match model.slots.get(&position) {
                        Some(Some(data)) => {
                            reply.status == Status::Ok as i32 && &reply.data == data
                        }
                        Some(None) => reply.status == Status::Invalidated as i32,
                        None => reply.status == Status::NotWritten as i32,
                    },
                }
            }
            Op::MaxPosition(epoch) => {
                let reply = store
                    .exec(OID, sealog::CLASS, "max_position", &client::max_position(epoch))
                    .unwrap();
                match (model.guard(epoch), model.max) {
                    (Some(status), _) => reply.status == status,
                    (None, None) => reply.status == NOT_FOUND,
                    (None, Some(max)) => {
                        reply.status == Status::Ok as i32
                            && client::max_position_reply(&reply.data) == Ok(max)
                    }
                }
            }
            Op::GetProjection => {
                let reply = store
                    .exec(OID, sealog::CLASS, "get_projection", &client::get_projection())
                    .unwrap();
                match model.projection {
                    None => reply.status == NOT_FOUND,
                    Some(counter) => {
                        reply.status == Status::Ok as i32
                            && client::get_projection_reply(&reply.data) == Ok(counter)
                    }
                }
            }
            Op::SetProjection => {
                let reply = store
                    .exec(OID, sealog::CLASS, "set_projection", &client::set_projection())
                    .unwrap();
                model.projection = Some(model.projection.map_or(0, |counter| counter + 1));
                reply.status == Status::Ok as i32
            }
        };
        if !ok {
            return false;
        }

        // The tracked maximum must equal the largest written position.
        let written_max = model
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_some())
            .map(|(position, _)| *position)
            .max();
        if model.max != written_max {
            return false;
        }
    }
    true
}

quickcheck! {
    fn state_machine_fuzz(ops: Vec<Op>) -> bool {
        let dir = tempfile::TempDir::new().unwrap();
        let mut registry = Registry::new();
        sealog::register(&mut registry);
        let store = Store::open(dir.path(), registry).unwrap();

        run(&store, ops)
    }
}
