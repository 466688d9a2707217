//! Shared construction of outbound HTTP clients.

use reqwest::Client;
use std::time::Duration;

/// Build a `reqwest` client tagged with `user_agent`.
///
/// No timeout is applied unless one is configured; a stalled provider then stalls the request.
pub(crate) fn build_client(
    user_agent: &str,
    timeout: Option<Duration>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
