//! Access policy encoding.
//!
//! The policy produced here is the confidentiality boundary of the whole
//! credential: the encryption network will only unwrap the key for a
//! requester proving control of the address bound into the clause.

use crate::types::{AccessCondition, AccessPolicy, Address, ReturnValueTest};

use super::error::CredentialError;

/// Condition family for plain address checks.
pub const CONDITION_TYPE: &str = "evmBasic";

/// Placeholder the network substitutes with the requester's proven address.
pub const USER_ADDRESS_PARAM: &str = ":userAddress";

/// Builds the single-clause policy "requester address equals `address` on
/// `network`".
///
/// Fails with [`CredentialError::MissingNetwork`] for an empty network name.
pub fn encode_policy(address: &Address, network: &str) -> Result<AccessPolicy, CredentialError> {
    if network.trim().is_empty() {
        return Err(CredentialError::MissingNetwork(
            "empty network name for access policy".to_string(),
        ));
    }

    Ok(AccessPolicy(vec![AccessCondition {
        condition_type: CONDITION_TYPE.to_string(),
        contract_address: String::new(),
        standard_contract_type: String::new(),
        chain: network.to_string(),
        method: String::new(),
        parameters: vec![USER_ADDRESS_PARAM.to_string()],
        return_value_test: ReturnValueTest {
            comparator: "=".to_string(),
            value: address.as_str().to_string(),
        },
    }]))
}
