//! Minerva - campus assistant service.
//!
//! Retrieval-augmented chat over institutional documents plus a
//! function-calling loop for authenticated campus actions. This crate is
//! the HTTP surface and startup wiring; the domain lives in the
//! workspace crates (`minerva-core`, `minerva-tools`, `minerva-llm`,
//! `minerva-retrieval`, `minerva-store`).

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod server;
