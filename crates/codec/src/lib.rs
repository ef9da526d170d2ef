//! Audio codec primitives shared across the call pipeline.
//!
//! Carriers speak 8kHz mu-law; everything upstream of the wire (VAD, the LLM
//! session, conversation intelligence) speaks normalized f32 PCM. This crate
//! is the one place those conversions happen: mu-law <-> PCM16, resampling
//! between carrier and model sample rates, and RMS/dB energy.

pub mod energy;
pub mod frame;
pub mod mulaw;

pub use energy::{rms_db, SILENCE_FLOOR_DB};
pub use frame::{AudioBuffer, AudioEncoding, AudioFrame, Channels, SampleRate};
pub use mulaw::{decode_buffer, encode_buffer, linear_to_ulaw, ulaw_to_linear};
