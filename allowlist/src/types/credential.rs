// allowlist/src/types/credential.rs

//! Credential payloads produced by the pipeline.
//!
//! This module defines the signature, the sealed credential and the two
//! records that leave the process:
//!
//! - [`PublicationRecord`], the JSON body sent to the pinning service, and
//! - [`ChunkAuditFile`], the plaintext audit record written per chunk.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{Address, AuctionRef, HASH_LEN};

/// Length in bytes of an encoded [`AuthoritySignature`] (`v‖r‖s`).
pub const SIGNATURE_LEN: usize = 1 + 2 * HASH_LEN;

/// Recoverable ECDSA signature by the authority over a commitment.
///
/// `v` is always normalized to 27 or 28. The on-chain verifier consumes
/// the packed `v‖r‖s` layout returned by [`AuthoritySignature::to_bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AuthoritySignature {
    pub v: u8,
    pub r: [u8; HASH_LEN],
    pub s: [u8; HASH_LEN],
}

impl AuthoritySignature {
    /// Packs the signature as `v‖r‖s` (65 bytes).
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[0] = self.v;
        out[1..1 + HASH_LEN].copy_from_slice(&self.r);
        out[1 + HASH_LEN..].copy_from_slice(&self.s);
        out
    }

    /// Returns the `0x`-prefixed lowercase hex of [`Self::to_bytes`].
    ///
    /// This is the form written to audit files and the plaintext that gets
    /// sealed for the participant.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// Authority signature after encryption under an access policy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SealedCredential {
    /// `nonce‖ciphertext‖tag` of the signature hex under a one-time key.
    pub ciphertext: Vec<u8>,
    /// The one-time key as wrapped by the encryption network.
    ///
    /// Only a caller that satisfies the access policy can get it unwrapped.
    pub wrapped_key: Vec<u8>,
}

/// Pinning options: always CIDv1.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinOptions {
    pub cid_version: u8,
}

/// Searchable key/values attached to a pin.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinKeyValues {
    pub address: String,
    pub auction_id: String,
}

/// Pin metadata: a `<chainId>-<auctionId>-<address>` name plus key/values.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PinMetadata {
    pub name: String,
    pub keyvalues: PinKeyValues,
}

/// Pinned content: the sealed credential in transport encodings.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinContent {
    /// Standard base64 of [`SealedCredential::ciphertext`].
    pub encrypted_string: String,
    /// Lowercase hex (no prefix) of [`SealedCredential::wrapped_key`].
    pub encrypted_symmetric_key: String,
}

/// Per-address body sent to the pinning service.
///
/// Write-once; the service keys it by content address.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRecord {
    pub pinata_options: PinOptions,
    pub pinata_metadata: PinMetadata,
    pub pinata_content: PinContent,
}

impl PublicationRecord {
    /// Builds the record for one participant's sealed credential.
    pub fn new(auction: &AuctionRef, address: &Address, sealed: &SealedCredential) -> Self {
        Self {
            pinata_options: PinOptions { cid_version: 1 },
            pinata_metadata: PinMetadata {
                name: format!("{}-{}-{}", auction.chain_id, auction.auction_id, address),
                keyvalues: PinKeyValues {
                    address: address.as_str().to_string(),
                    auction_id: auction.auction_id.to_string(),
                },
            },
            pinata_content: PinContent {
                encrypted_string: base64::engine::general_purpose::STANDARD
                    .encode(&sealed.ciphertext),
                encrypted_symmetric_key: hex::encode(&sealed.wrapped_key),
            },
        }
    }

    /// Address this record was published for.
    pub fn address(&self) -> &str {
        &self.pinata_metadata.keyvalues.address
    }
}

/// One `{user, signature}` line of a chunk audit file.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct SignatureEntry {
    pub user: String,
    pub signature: String,
}

/// Plaintext audit record for one chunk of addresses.
///
/// Signatures appear in the order the addresses were read.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkAuditFile {
    pub auction_id: u64,
    pub chain_id: u64,
    pub allow_list_contract: String,
    pub signatures: Vec<SignatureEntry>,
}

impl ChunkAuditFile {
    /// Builds the audit record for `auction` from the chunk's signatures.
    pub fn new(auction: &AuctionRef, signatures: Vec<SignatureEntry>) -> Self {
        Self {
            auction_id: auction.auction_id,
            chain_id: auction.chain_id,
            allow_list_contract: auction.allow_list_contract.as_str().to_string(),
            signatures,
        }
    }
}

/// Self-signed bearer assertion authenticating the authority to the
/// encryption network. One per run.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    /// `0x`-hex personal-message signature over `signed_message`.
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    /// Checksummed authority address.
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auction() -> AuctionRef {
        AuctionRef {
            auction_id: 7,
            chain_id: 100,
            allow_list_contract: Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
                .unwrap(),
        }
    }

    #[test]
    fn signature_packs_v_then_r_then_s() {
        let sig = AuthoritySignature {
            v: 28,
            r: [0x11; HASH_LEN],
            s: [0x22; HASH_LEN],
        };

        let bytes = sig.to_bytes();
        assert_eq!(bytes.len(), SIGNATURE_LEN);
        assert_eq!(bytes[0], 28);
        assert!(bytes[1..33].iter().all(|b| *b == 0x11));
        assert!(bytes[33..].iter().all(|b| *b == 0x22));

        let hex = sig.to_hex();
        assert!(hex.starts_with("0x1c1111"));
        assert_eq!(hex.len(), 2 + SIGNATURE_LEN * 2);
    }

    #[test]
    fn publication_record_uses_pinata_json_shape() {
        let address = Address::parse("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359").unwrap();
        let sealed = SealedCredential {
            ciphertext: vec![1, 2, 3],
            wrapped_key: vec![0xab, 0xcd],
        };

        let record = PublicationRecord::new(&auction(), &address, &sealed);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["pinataOptions"]["cidVersion"], 1);
        assert_eq!(
            json["pinataMetadata"]["name"],
            "100-7-0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
        assert_eq!(
            json["pinataMetadata"]["keyvalues"]["address"],
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
        assert_eq!(json["pinataMetadata"]["keyvalues"]["auctionId"], "7");
        assert_eq!(json["pinataContent"]["encryptedString"], "AQID");
        assert_eq!(json["pinataContent"]["encryptedSymmetricKey"], "abcd");
        assert_eq!(record.address(), address.as_str());
    }

    #[test]
    fn chunk_audit_file_uses_camel_case_keys() {
        let file = ChunkAuditFile::new(
            &auction(),
            vec![SignatureEntry {
                user: "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359".to_string(),
                signature: "0x1c".to_string(),
            }],
        );

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["auctionId"], 7);
        assert_eq!(json["chainId"], 100);
        assert_eq!(
            json["allowListContract"],
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(json["signatures"][0]["user"], file.signatures[0].user);
    }
}
