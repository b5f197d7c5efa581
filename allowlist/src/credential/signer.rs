//! Authority signing.
//!
//! The authority's key lives in an external signer (a node, a hardware
//! wallet behind a JSON-RPC endpoint, ...). This module only defines the
//! seam ([`AuthoritySigner`]) and turns whatever the signer returns into a
//! validated [`AuthoritySignature`].

use tracing::debug;

use crate::types::{Address, AuthoritySignature, Commitment, HASH_LEN, Hash256, SIGNATURE_LEN};

use super::error::CredentialError;

/// Errors reported by an external signer or chain client.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// Transport-level failure (connection refused, timeout, ...).
    #[error("signer unreachable: {0}")]
    Unavailable(String),
    /// The signer answered but refused the request (locked account, ...).
    #[error("signer refused request: {0}")]
    Rejected(String),
    /// The signer answered with something that is not a valid response.
    #[error("malformed signer response: {0}")]
    Protocol(String),
}

impl From<SignerError> for CredentialError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::Unavailable(_) | SignerError::Rejected(_) => {
                CredentialError::SigningUnavailable(e.to_string())
            }
            SignerError::Protocol(msg) => CredentialError::SignatureEncodingError(msg),
        }
    }
}

/// External signing identity of the authority.
///
/// `sign_message` has personal-message semantics: the implementation is
/// expected to hash `"\x19Ethereum Signed Message:\n" ‖ len ‖ message` and
/// return the 65-byte `r‖s‖v` signature. Key material never crosses this
/// boundary.
pub trait AuthoritySigner {
    /// Address of the signing identity.
    fn address(&self) -> &Address;

    /// Signs `message` as a personal message.
    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}

impl<T: AuthoritySigner + ?Sized> AuthoritySigner for &T {
    fn address(&self) -> &Address {
        (**self).address()
    }

    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        (**self).sign_message(message)
    }
}

/// Digest a personal-message signer actually signs for `message`.
pub fn personal_message_digest(message: &[u8]) -> Hash256 {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    Hash256::keccak256_chunks([prefix.as_bytes(), message])
}

/// Decomposes a 65-byte `r‖s‖v` signature into `(v, r, s)`.
///
/// `v` may come back as a recovery id (0/1) or already offset (27/28); it is
/// normalized to 27/28. Zero `r` or `s` can never verify and is rejected.
pub fn decompose_signature(raw: &[u8]) -> Result<AuthoritySignature, CredentialError> {
    if raw.len() != SIGNATURE_LEN {
        return Err(CredentialError::SignatureEncodingError(format!(
            "expected {SIGNATURE_LEN} signature bytes, got {}",
            raw.len()
        )));
    }

    let mut r = [0u8; HASH_LEN];
    let mut s = [0u8; HASH_LEN];
    r.copy_from_slice(&raw[..HASH_LEN]);
    s.copy_from_slice(&raw[HASH_LEN..2 * HASH_LEN]);

    let v = match raw[2 * HASH_LEN] {
        v @ (0 | 1) => v + 27,
        v @ (27 | 28) => v,
        other => {
            return Err(CredentialError::SignatureEncodingError(format!(
                "invalid recovery byte v={other}"
            )));
        }
    };

    if r.iter().all(|b| *b == 0) || s.iter().all(|b| *b == 0) {
        return Err(CredentialError::SignatureEncodingError(
            "zero r or s component".to_string(),
        ));
    }

    Ok(AuthoritySignature { v, r, s })
}

/// Signs the raw commitment bytes (not their hex, not a re-hash) and
/// validates the result.
pub fn sign_commitment<S>(
    signer: &S,
    commitment: &Commitment,
) -> Result<AuthoritySignature, CredentialError>
where
    S: AuthoritySigner + ?Sized,
{
    let raw = signer.sign_message(commitment.as_bytes())?;
    let signature = decompose_signature(&raw)?;
    debug!(
        commitment = %commitment.0.to_hex(),
        v = signature.v,
        "commitment signed"
    );
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingSigner, LocalKeySigner};

    fn raw_signature(v: u8) -> Vec<u8> {
        let mut raw = vec![0x11; HASH_LEN];
        raw.extend_from_slice(&[0x22; HASH_LEN]);
        raw.push(v);
        raw
    }

    #[test]
    fn recovery_ids_are_normalized() {
        assert_eq!(decompose_signature(&raw_signature(0)).unwrap().v, 27);
        assert_eq!(decompose_signature(&raw_signature(1)).unwrap().v, 28);
        assert_eq!(decompose_signature(&raw_signature(27)).unwrap().v, 27);
        assert_eq!(decompose_signature(&raw_signature(28)).unwrap().v, 28);
    }

    #[test]
    fn decomposition_moves_v_to_the_front() {
        let sig = decompose_signature(&raw_signature(1)).unwrap();
        assert_eq!(sig.r, [0x11; HASH_LEN]);
        assert_eq!(sig.s, [0x22; HASH_LEN]);
        assert_eq!(sig.to_bytes()[0], 28);
    }

    #[test]
    fn malformed_signatures_are_encoding_errors() {
        let too_short = vec![1u8; 64];
        let bad_v = raw_signature(5);
        let mut zero_r = raw_signature(27);
        zero_r[..HASH_LEN].fill(0);

        for raw in [too_short, bad_v, zero_r] {
            let err = decompose_signature(&raw).unwrap_err();
            assert!(
                matches!(err, CredentialError::SignatureEncodingError(_)),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn personal_message_digest_prefixes_length() {
        let digest = personal_message_digest(&[0xaa; 32]);
        let mut manual = b"\x19Ethereum Signed Message:\n32".to_vec();
        manual.extend_from_slice(&[0xaa; 32]);
        assert_eq!(digest, Hash256::keccak256(&manual));
    }

    #[test]
    fn commitment_signature_recovers_to_authority() {
        let signer = LocalKeySigner::from_seed(1);
        let commitment = Commitment(Hash256::keccak256(b"participant"));

        let signature = sign_commitment(&signer, &commitment).unwrap();
        let recovered = signer.recover(commitment.as_bytes(), &signature);

        assert_eq!(&recovered, signer.address());
    }

    #[test]
    fn unreachable_signer_is_signing_unavailable() {
        let commitment = Commitment(Hash256::keccak256(b"participant"));
        let err = sign_commitment(&FailingSigner::default(), &commitment).unwrap_err();
        assert!(matches!(err, CredentialError::SigningUnavailable(_)));
    }
}
