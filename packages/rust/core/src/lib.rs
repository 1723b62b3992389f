//! Core pipeline orchestration and domain logic for the horoscope batch.
//!
//! This crate ties together source reading, field normalization, prompt
//! building, text generation and checkpointing into one sequential run
//! (see [`pipeline::run_pipeline`]).

pub mod checkpoint;
pub mod context;
pub mod fields;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
