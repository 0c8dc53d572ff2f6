use async_trait::async_trait;

use crate::dns::SMessage;
use crate::error::Result;

/// The recursive resolver this validator sits in front of.
///
/// Implementations own all wire concerns: message encoding, UDP/TCP
/// transport, retries and truncation. The contract the validator relies
/// on: the CD flag it sets is forwarded unchanged, queries go out with
/// EDNS0 DO=1 and a payload size of at least 1232, and referrals come
/// back as referrals rather than collapsed into answers.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send one query and return the response. Errors are transient
    /// transport failures; the validator turns them into SERVFAIL.
    async fn send(&self, query: SMessage) -> Result<SMessage>;
}
