//! HTTP clients for the external collaborators of a run.
//!
//! Every client uses the blocking `reqwest` client: the pipeline is
//! strictly sequential, so there is never more than one request in flight.
//!
//! - [`rpc::JsonRpcClient`]: chain identity and authority signing over
//!   JSON-RPC,
//! - [`key_network::HttpKeyNetwork`]: the encryption network gateway,
//! - [`pinata::PinataClient`]: the pinning service,
//! - [`api::SignatureApiClient`]: forwarding of chunk audit files.

pub mod api;
pub mod key_network;
pub mod pinata;
pub mod rpc;

pub use api::SignatureApiClient;
pub use key_network::HttpKeyNetwork;
pub use pinata::PinataClient;
pub use rpc::JsonRpcClient;

/// Joins `base` and `path` with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_avoids_double_slashes() {
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a", "b/c"), "http://a/b/c");
    }
}
