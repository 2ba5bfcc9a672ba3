//! Core trait abstractions for the pipeline.
//!
//! These traits are the seams to external services: speech synthesis and
//! the remote object store. Production implementations live in [`crate::synth`]
//! and [`crate::upload`]; mocks live in [`crate::testing`].

pub mod store;
pub mod synthesizer;
