//! Carrier media-socket bridge (spec §4.9): wire envelope framing plus the
//! `MediaBridge` that demuxes it, converts mu-law/PCM across the carrier
//! and model sample rates via `voxloop-codec`, and enforces the bridge's
//! explicit backpressure policy in both directions.

pub mod bridge;
pub mod envelope;
pub mod error;

pub use bridge::{BridgeStatus, MediaBridge};
pub use envelope::{
    build_outbound_media_frame, CarrierEvent, MarkPayload, MediaFormat, MediaPayload,
    StartPayload, StopPayload,
};
pub use error::{MediaError, Result};
