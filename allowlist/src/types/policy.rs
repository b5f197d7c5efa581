//! Access-control predicates understood by the encryption network.
//!
//! An [`AccessPolicy`] is an ordered list of [`AccessCondition`] clauses. The
//! network evaluates them against whoever asks for a wrapped key to be
//! unwrapped. The JSON field names follow the network's wire format.

use serde::{Deserialize, Serialize};

/// Comparison applied to the value a condition resolves to.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ReturnValueTest {
    pub comparator: String,
    pub value: String,
}

/// A single access-control clause.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessCondition {
    /// Condition family, e.g. `"evmBasic"`.
    pub condition_type: String,
    pub contract_address: String,
    pub standard_contract_type: String,
    /// Network name the condition is evaluated on.
    pub chain: String,
    pub method: String,
    /// Parameters; `":userAddress"` stands for the requester's proven address.
    pub parameters: Vec<String>,
    pub return_value_test: ReturnValueTest,
}

/// Ordered list of clauses, serialized as a bare JSON array.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct AccessPolicy(pub Vec<AccessCondition>);

impl AccessPolicy {
    /// Returns the clauses in evaluation order.
    pub fn conditions(&self) -> &[AccessCondition] {
        &self.0
    }

    /// Returns the address a single-clause address-equality policy is bound to.
    ///
    /// `None` for any other policy shape.
    pub fn bound_address(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only]
                if only.parameters == [":userAddress"]
                    && only.return_value_test.comparator == "=" =>
            {
                Some(&only.return_value_test.value)
            }
            _ => None,
        }
    }
}
