//! The seven payload kinds (§4.2) and the fixed 5-byte header that precedes
//! every one of them on-chain.

use cvm_types::{Address, Hash};

use crate::errors::EnvelopeError;
use crate::wire::{Reader, Writer};

/// The 3-byte ASCII magic distinguishing VM/trust-graph payloads from bare
/// reputation votes.
pub const MAGIC_CVM: [u8; 3] = *b"CVM";
/// The 3-byte ASCII magic for VOTE payloads.
pub const MAGIC_REP: [u8; 3] = *b"REP";

/// The single supported envelope version.
pub const VERSION: u8 = 0x01;

/// Type tags, in the order §4.2 lists them.
pub mod tag {
    /// DEPLOY
    pub const DEPLOY: u8 = 0x01;
    /// CALL
    pub const CALL: u8 = 0x02;
    /// VOTE
    pub const VOTE: u8 = 0x03;
    /// TRUST-EDGE
    pub const TRUST_EDGE: u8 = 0x10;
    /// BONDED-VOTE
    pub const BONDED_VOTE: u8 = 0x11;
    /// DISPUTE
    pub const DISPUTE: u8 = 0x20;
    /// DISPUTE-VOTE
    pub const DISPUTE_VOTE: u8 = 0x21;
}

/// Deploy new bytecode (§4.3 "DEPLOY").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deploy {
    /// SHA-256 of the bytecode being deployed (the body carries a hash, not
    /// the code itself — the code rides in the transaction's witness data
    /// and is resolved by the block processor before bytecode validation).
    pub code_hash: Hash,
    /// Gas limit the deployer is willing to spend validating the bytecode.
    pub gas_limit: u64,
    /// Constructor-style init data, interpreted by the handler only (the VM
    /// itself runs no constructor).
    pub init_data: Vec<u8>,
}

/// Invoke a deployed contract (§4.3 "CALL").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    /// Target contract address.
    pub contract_addr: Address,
    /// Gas limit forwarded to the interpreter.
    pub gas_limit: u64,
    /// Value attached to the call, smallest on-chain unit.
    pub value: u64,
    /// Call input bytes, exposed to the interpreter as `ctx.input`.
    pub input: Vec<u8>,
}

/// A signed reputation vote (§4.3 "VOTE").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    /// Target address being voted on.
    pub target_addr: Address,
    /// Signed vote delta, clamped to `[-100, 100]`.
    pub vote: i32,
    /// Unix timestamp the vote was cast.
    pub timestamp: u64,
}

/// A bonded directed trust edge (§4.3 "TRUST-EDGE").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustEdgePayload {
    /// Source address.
    pub from: Address,
    /// Target address.
    pub to: Address,
    /// Integer weight in `[-100, 100]`.
    pub weight: i32,
    /// Declared bond amount; checked against output index 1.
    pub bond_amount: u64,
    /// Unix timestamp.
    pub timestamp: u64,
}

/// A bonded reputation vote (§4.3 "BONDED-VOTE").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BondedVotePayload {
    /// Voting address.
    pub voter: Address,
    /// Target address.
    pub target: Address,
    /// Integer weight in `[-100, 100]`.
    pub vote: i32,
    /// Declared bond amount; checked against output index 1.
    pub bond_amount: u64,
    /// Unix timestamp.
    pub timestamp: u64,
}

/// A challenge against a previously cast vote (§4.3 "DISPUTE").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisputePayload {
    /// The address opening the dispute.
    pub challenger: Address,
    /// The vote transaction being challenged.
    pub original_vote_tx: Hash,
    /// Declared challenge bond; checked against output index 1.
    pub challenge_bond: u64,
    /// Free-text reason, capped at the body's remaining length by the
    /// transaction's own size limits.
    pub reason: Vec<u8>,
    /// Unix timestamp.
    pub timestamp: u64,
}

/// A juror vote within an open dispute (§4.3 "DISPUTE-VOTE").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisputeVotePayload {
    /// The voting juror.
    pub juror: Address,
    /// The dispute being voted on.
    pub dispute_id: Hash,
    /// `true` to support slashing the challenged bond.
    pub support_slash: bool,
    /// Stake the juror is backing their vote with.
    pub stake: u64,
    /// Unix timestamp.
    pub timestamp: u64,
}

/// The decoded payload, tagged by which of the seven kinds it is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// 0x01
    Deploy(Deploy),
    /// 0x02
    Call(Call),
    /// 0x03
    Vote(Vote),
    /// 0x10
    TrustEdge(TrustEdgePayload),
    /// 0x11
    BondedVote(BondedVotePayload),
    /// 0x20
    Dispute(DisputePayload),
    /// 0x21
    DisputeVote(DisputeVotePayload),
}

impl Payload {
    /// Whether this payload kind requires a bond output at index 1 (§4.2
    /// "Bond-bearing types").
    #[must_use]
    pub fn is_bond_bearing(&self) -> bool {
        matches!(
            self,
            Payload::TrustEdge(_) | Payload::BondedVote(_) | Payload::Dispute(_) | Payload::DisputeVote(_)
        )
    }

    /// The declared bond amount, for bond-bearing payloads.
    #[must_use]
    pub fn declared_bond(&self) -> Option<u64> {
        match self {
            Payload::TrustEdge(p) => Some(p.bond_amount),
            Payload::BondedVote(p) => Some(p.bond_amount),
            Payload::Dispute(p) => Some(p.challenge_bond),
            Payload::DisputeVote(p) => Some(p.stake),
            _ => None,
        }
    }

    /// The type tag this payload would encode as.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Payload::Deploy(_) => tag::DEPLOY,
            Payload::Call(_) => tag::CALL,
            Payload::Vote(_) => tag::VOTE,
            Payload::TrustEdge(_) => tag::TRUST_EDGE,
            Payload::BondedVote(_) => tag::BONDED_VOTE,
            Payload::Dispute(_) => tag::DISPUTE,
            Payload::DisputeVote(_) => tag::DISPUTE_VOTE,
        }
    }

    /// The magic this payload belongs under.
    #[must_use]
    pub fn magic(&self) -> [u8; 3] {
        match self {
            Payload::Vote(_) => MAGIC_REP,
            _ => MAGIC_CVM,
        }
    }
}

/// A fully parsed envelope: header plus decoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// The decoded payload.
    pub payload: Payload,
}

/// Parse `DATA <magic(3)> <version(1)> <type(1)> <tlv-body>` (§4.2, §6.1).
///
/// Returns `Err` for every malformed case; callers treat all of them as a
/// soft "Payload-malformed" error per §7 — log and skip, never
/// block-invalidating.
pub fn parse_envelope(data: &[u8]) -> Result<Envelope, EnvelopeError> {
    if data.len() < 5 {
        return Err(EnvelopeError::Truncated);
    }
    let magic = [data[0], data[1], data[2]];
    if magic != MAGIC_CVM && magic != MAGIC_REP {
        return Err(EnvelopeError::UnknownMagic(magic));
    }
    let version = data[3];
    if version != VERSION {
        return Err(EnvelopeError::UnsupportedVersion(version));
    }
    let tag = data[4];
    let body = &data[5..];

    let expects_rep = tag == tag::VOTE;
    if expects_rep && magic != MAGIC_REP {
        return Err(EnvelopeError::MagicTypeMismatch { magic, tag });
    }
    if !expects_rep && magic != MAGIC_CVM {
        return Err(EnvelopeError::MagicTypeMismatch { magic, tag });
    }

    let payload = decode_body(tag, body)?;
    Ok(Envelope { payload })
}

fn decode_body(tag: u8, body: &[u8]) -> Result<Payload, EnvelopeError> {
    let mut reader = Reader::new(body);
    let payload = match tag {
        tag::DEPLOY => Payload::Deploy(Deploy {
            code_hash: reader.hash("code_hash")?,
            gas_limit: reader.u64("gas_limit")?,
            init_data: reader.bytes("init_data")?,
        }),
        tag::CALL => Payload::Call(Call {
            contract_addr: reader.address("contract_addr")?,
            gas_limit: reader.u64("gas_limit")?,
            value: reader.u64("value")?,
            input: reader.bytes("input")?,
        }),
        tag::VOTE => {
            let target_addr = reader.address("target_addr")?;
            let vote = reader.i32("vote")?;
            if !(-100..=100).contains(&vote) {
                return Err(EnvelopeError::OutOfRange {
                    field: "vote",
                    value: i64::from(vote),
                });
            }
            Payload::Vote(Vote {
                target_addr,
                vote,
                timestamp: reader.u64("timestamp")?,
            })
        }
        tag::TRUST_EDGE => {
            let from = reader.address("from")?;
            let to = reader.address("to")?;
            let weight = reader.i32("weight")?;
            if !(-100..=100).contains(&weight) {
                return Err(EnvelopeError::OutOfRange {
                    field: "weight",
                    value: i64::from(weight),
                });
            }
            Payload::TrustEdge(TrustEdgePayload {
                from,
                to,
                weight,
                bond_amount: reader.u64("bond_amount")?,
                timestamp: reader.u64("timestamp")?,
            })
        }
        tag::BONDED_VOTE => {
            let voter = reader.address("voter")?;
            let target = reader.address("target")?;
            let vote = reader.i32("vote")?;
            if !(-100..=100).contains(&vote) {
                return Err(EnvelopeError::OutOfRange {
                    field: "vote",
                    value: i64::from(vote),
                });
            }
            Payload::BondedVote(BondedVotePayload {
                voter,
                target,
                vote,
                bond_amount: reader.u64("bond_amount")?,
                timestamp: reader.u64("timestamp")?,
            })
        }
        tag::DISPUTE => Payload::Dispute(DisputePayload {
            challenger: reader.address("challenger")?,
            original_vote_tx: reader.hash("original_vote_tx")?,
            challenge_bond: reader.u64("challenge_bond")?,
            reason: reader.bytes("reason")?,
            timestamp: reader.u64("timestamp")?,
        }),
        tag::DISPUTE_VOTE => Payload::DisputeVote(DisputeVotePayload {
            juror: reader.address("juror")?,
            dispute_id: reader.hash("dispute_id")?,
            support_slash: reader.bool("support_slash")?,
            stake: reader.u64("stake")?,
            timestamp: reader.u64("timestamp")?,
        }),
        other => return Err(EnvelopeError::UnknownType(other)),
    };
    if !reader.is_exhausted() {
        return Err(EnvelopeError::TruncatedField("trailing bytes"));
    }
    Ok(payload)
}

/// Encode a payload to its bit-exact on-chain bytes, header included.
#[must_use]
pub fn encode_envelope(payload: &Payload) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&payload.magic());
    out.push(VERSION);
    out.push(payload.tag());
    let mut writer = Writer::new();
    match payload {
        Payload::Deploy(p) => {
            writer.hash(p.code_hash).u64(p.gas_limit).bytes(&p.init_data);
        }
        Payload::Call(p) => {
            writer
                .address(p.contract_addr)
                .u64(p.gas_limit)
                .u64(p.value)
                .bytes(&p.input);
        }
        Payload::Vote(p) => {
            writer.address(p.target_addr).i32(p.vote).u64(p.timestamp);
        }
        Payload::TrustEdge(p) => {
            writer
                .address(p.from)
                .address(p.to)
                .i32(p.weight)
                .u64(p.bond_amount)
                .u64(p.timestamp);
        }
        Payload::BondedVote(p) => {
            writer
                .address(p.voter)
                .address(p.target)
                .i32(p.vote)
                .u64(p.bond_amount)
                .u64(p.timestamp);
        }
        Payload::Dispute(p) => {
            writer
                .address(p.challenger)
                .hash(p.original_vote_tx)
                .u64(p.challenge_bond)
                .bytes(&p.reason)
                .u64(p.timestamp);
        }
        Payload::DisputeVote(p) => {
            writer
                .address(p.juror)
                .hash(p.dispute_id)
                .bool(p.support_slash)
                .u64(p.stake)
                .u64(p.timestamp);
        }
    }
    out.extend_from_slice(&writer.finish());
    out
}
