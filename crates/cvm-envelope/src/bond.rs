//! Bond-output validation for the four bond-bearing payload kinds (§4.2,
//! §6.1): output index 1 must be a 23-byte P2SH script with value at least
//! the payload's declared bond.

/// `OP_HASH160`
const OP_HASH160: u8 = 0xa9;
/// Push of the next 20 bytes.
const PUSH_20: u8 = 0x14;
/// `OP_EQUAL`
const OP_EQUAL: u8 = 0x87;

/// The fixed length of a P2SH script: `OP_HASH160 <20-byte hash> OP_EQUAL`.
pub const P2SH_SCRIPT_LEN: usize = 23;

/// A transaction output as the envelope scanner sees it: value and raw
/// script bytes. Deliberately minimal — this core has no opinion on the rest
/// of the UTXO layer's output model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Output value, smallest on-chain unit.
    pub value: u64,
    /// Raw `scriptPubKey` bytes.
    pub script_pubkey: Vec<u8>,
}

/// Whether `script` is a well-formed 23-byte P2SH script
/// (`OP_HASH160 <20-byte-hash> OP_EQUAL`).
#[must_use]
pub fn is_p2sh_script(script: &[u8]) -> bool {
    script.len() == P2SH_SCRIPT_LEN
        && script[0] == OP_HASH160
        && script[1] == PUSH_20
        && script[22] == OP_EQUAL
}

/// Validate that `outputs[1]` is a P2SH output whose value is at least
/// `declared_bond`. Returns `false` for a missing index-1 output, a
/// non-P2SH script, or an insufficient value — the handler's only response
/// to any of these is a silent skip (§4.2 "Missing/insufficient bond").
#[must_use]
pub fn bond_output_is_sufficient(outputs: &[TxOutput], declared_bond: u64) -> bool {
    match outputs.get(1) {
        Some(output) => is_p2sh_script(&output.script_pubkey) && output.value >= declared_bond,
        None => false,
    }
}

/// Build the 20-byte script-hash slice out of a validated P2SH script.
///
/// # Panics
/// Panics if `script` is not a 23-byte P2SH script; callers must check
/// [`is_p2sh_script`] first.
#[must_use]
pub fn script_hash(script: &[u8]) -> [u8; 20] {
    assert!(is_p2sh_script(script), "not a P2SH script");
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[2..22]);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p2sh(value: u64, hash: u8) -> TxOutput {
        let mut script = vec![OP_HASH160, PUSH_20];
        script.extend_from_slice(&[hash; 20]);
        script.push(OP_EQUAL);
        TxOutput {
            value,
            script_pubkey: script,
        }
    }

    #[test]
    fn sufficient_bond_passes() {
        let outputs = vec![
            TxOutput {
                value: 0,
                script_pubkey: vec![],
            },
            p2sh(1000, 0xaa),
        ];
        assert!(bond_output_is_sufficient(&outputs, 1000));
        assert!(bond_output_is_sufficient(&outputs, 500));
    }

    #[test]
    fn insufficient_value_fails() {
        let outputs = vec![
            TxOutput {
                value: 0,
                script_pubkey: vec![],
            },
            p2sh(100, 0xaa),
        ];
        assert!(!bond_output_is_sufficient(&outputs, 1000));
    }

    #[test]
    fn missing_output_fails() {
        assert!(!bond_output_is_sufficient(&[], 1));
    }

    #[test]
    fn non_p2sh_script_fails() {
        let outputs = vec![
            TxOutput {
                value: 0,
                script_pubkey: vec![],
            },
            TxOutput {
                value: 1000,
                script_pubkey: vec![0x76, 0xa9],
            },
        ];
        assert!(!bond_output_is_sufficient(&outputs, 1000));
    }
}
