//! Locates the payload-carrying output within a transaction (§4.2 "Parser
//! scans outputs in index order").

use crate::bond::TxOutput;
use crate::errors::EnvelopeError;
use crate::payload::{self, Envelope, MAGIC_CVM, MAGIC_REP, VERSION};

const OP_RETURN: u8 = 0x6a;
const OP_PUSHDATA1: u8 = 0x4c;
const MAX_DIRECT_PUSH: u8 = 0x4b;

/// Extract the pushed data following an `OP_RETURN` opcode, if any.
/// Supports a direct push (length byte in `[0x01, 0x4b]`) and
/// `OP_PUSHDATA1` (a 1-byte length byte follows); anything longer or using a
/// wider push opcode is outside what an envelope needs and is not an
/// envelope carrier.
fn op_return_data(script: &[u8]) -> Option<&[u8]> {
    let (first, rest) = script.split_first()?;
    if *first != OP_RETURN {
        return None;
    }
    let (opcode, rest) = rest.split_first()?;
    match *opcode {
        0x01..=MAX_DIRECT_PUSH => {
            let len = *opcode as usize;
            if rest.len() < len {
                return None;
            }
            Some(&rest[..len])
        }
        OP_PUSHDATA1 => {
            let (len_byte, body) = rest.split_first()?;
            let len = *len_byte as usize;
            if body.len() < len {
                return None;
            }
            Some(&body[..len])
        }
        _ => None,
    }
}

fn looks_like_envelope_header(data: &[u8]) -> bool {
    if data.len() < 5 {
        return false;
    }
    let magic = [data[0], data[1], data[2]];
    if magic != MAGIC_CVM && magic != MAGIC_REP {
        return false;
    }
    data[3] == VERSION
}

/// Scan `outputs` in order for the first one carrying an envelope header;
/// return its index and the parse result (which may itself be an error if
/// the body is malformed — per §4.2 that output is still "the payload
/// carrier", it just contributes nothing).
#[must_use]
pub fn find_envelope(outputs: &[TxOutput]) -> Option<(usize, Result<Envelope, EnvelopeError>)> {
    for (index, output) in outputs.iter().enumerate() {
        if let Some(data) = op_return_data(&output.script_pubkey) {
            if looks_like_envelope_header(data) {
                return Some((index, payload::parse_envelope(data)));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{encode_envelope, Call, Payload};
    use cvm_types::Address;

    fn op_return_output(body: &[u8]) -> TxOutput {
        let mut script = vec![OP_RETURN];
        if body.len() <= MAX_DIRECT_PUSH as usize {
            script.push(body.len() as u8);
        } else {
            script.push(OP_PUSHDATA1);
            script.push(body.len() as u8);
        }
        script.extend_from_slice(body);
        TxOutput {
            value: 0,
            script_pubkey: script,
        }
    }

    #[test]
    fn finds_the_first_matching_output() {
        let payload = Payload::Call(Call {
            contract_addr: Address::new([1; 20]),
            gas_limit: 1000,
            value: 0,
            input: vec![1, 2, 3],
        });
        let body = encode_envelope(&payload);
        let outputs = vec![
            TxOutput {
                value: 0,
                script_pubkey: vec![0x76, 0xa9],
            },
            op_return_output(&body),
            op_return_output(&body),
        ];
        let (index, result) = find_envelope(&outputs).unwrap();
        assert_eq!(index, 1);
        assert_eq!(result.unwrap().payload, payload);
    }

    #[test]
    fn non_op_return_outputs_are_skipped() {
        let outputs = vec![TxOutput {
            value: 0,
            script_pubkey: vec![0x76, 0xa9, 0x14],
        }];
        assert!(find_envelope(&outputs).is_none());
    }

    #[test]
    fn malformed_body_is_still_the_carrier() {
        let mut body = b"CVM".to_vec();
        body.push(VERSION);
        body.push(0x01); // DEPLOY tag, but no body bytes follow
        let outputs = vec![op_return_output(&body)];
        let (index, result) = find_envelope(&outputs).unwrap();
        assert_eq!(index, 0);
        assert!(result.is_err());
    }
}
