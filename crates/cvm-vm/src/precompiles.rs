//! Cryptographic opcodes: `SHA256`, `VERIFY-SIG`, `recover-pubkey`.

use crate::errors::VmError;
use cvm_types::Hash;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// `SHA256` opcode body.
#[must_use]
pub fn sha256(input: &[u8]) -> [u8; 32] {
    *Hash::sha256(input).as_bytes()
}

/// `VERIFY-SIG`: verify a 64-byte compact ECDSA signature over `message_hash`
/// against a 33-byte SEC1-compressed public key. Returns `Ok(true/false)`
/// rather than treating a bad signature as a fault — only malformed *input
/// encoding* is an error, matching the interpreter's halt-on-malformed-input
/// discipline while letting "signature doesn't verify" be an ordinary 0/1
/// stack result.
pub fn verify_sig(
    message_hash: &[u8; 32],
    signature_bytes: &[u8],
    pubkey_bytes: &[u8],
) -> Result<bool, VmError> {
    if signature_bytes.len() != 64 {
        return Err(VmError::Precompile(format!(
            "verify-sig: signature must be 64 bytes, got {}",
            signature_bytes.len()
        )));
    }
    let verifying_key = VerifyingKey::from_sec1_bytes(pubkey_bytes)
        .map_err(|e| VmError::Precompile(format!("verify-sig: bad pubkey: {e}")))?;
    let signature = Signature::from_slice(signature_bytes)
        .map_err(|e| VmError::Precompile(format!("verify-sig: bad signature: {e}")))?;
    Ok(verifying_key.verify_prehash(message_hash, &signature).is_ok())
}

/// `recover-pubkey`: recover the 33-byte SEC1-compressed public key from a
/// 64-byte signature plus a recovery id, over `message_hash`.
pub fn recover_pubkey(
    message_hash: &[u8; 32],
    signature_bytes: &[u8],
    recovery_id: u8,
) -> Result<[u8; 33], VmError> {
    if signature_bytes.len() != 64 {
        return Err(VmError::Precompile(format!(
            "recover-pubkey: signature must be 64 bytes, got {}",
            signature_bytes.len()
        )));
    }
    let signature = Signature::from_slice(signature_bytes)
        .map_err(|e| VmError::Precompile(format!("recover-pubkey: bad signature: {e}")))?;
    let id = RecoveryId::from_byte(recovery_id)
        .ok_or_else(|| VmError::Precompile("recover-pubkey: bad recovery id".to_string()))?;
    let verifying_key = VerifyingKey::recover_from_prehash(message_hash, &signature, id)
        .map_err(|e| VmError::Precompile(format!("recover-pubkey: recovery failed: {e}")))?;
    let encoded = verifying_key.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::SigningKey;

    #[test]
    fn sha256_matches_known_vector() {
        let digest = sha256(b"abc");
        // SHA-256("abc") per FIPS 180-2 test vectors.
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string()
        );
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let message_hash = [7u8; 32];
        let (signature, recid): (Signature, RecoveryId) =
            signing_key.sign_prehash_recoverable(&message_hash).unwrap();
        let verifying_key = VerifyingKey::from(&signing_key);
        let pubkey_bytes = verifying_key.to_encoded_point(true);

        assert!(verify_sig(&message_hash, &signature.to_bytes(), pubkey_bytes.as_bytes()).unwrap());

        let recovered = recover_pubkey(&message_hash, &signature.to_bytes(), recid.to_byte()).unwrap();
        assert_eq!(&recovered[..], pubkey_bytes.as_bytes());
    }
}

#[cfg(test)]
mod hex {
    pub fn encode(bytes: [u8; 32]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
