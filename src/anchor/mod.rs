//! Anchoring subsystem: artifact storage plus the external timestamping
//! authority boundary and the client that ties them together.

mod artifact;
mod authority;
mod client;

pub use artifact::ArtifactStore;
#[cfg(test)]
pub use authority::MockTimestampAuthority;
pub use authority::{AuthorityResponse, OtsAuthority, TimestampAuthority};
pub use client::HashAnchorClient;
