//! HTTP transfer pipeline
//!
//! Split in two phases:
//! - [`probe`] — a capability probe that discovers the file size, whether the
//!   server honors byte ranges, and any server-suggested filename
//! - [`stream`] — the chunked streaming fetch that writes into the temp file,
//!   resuming from whatever is already on disk when the server allows it

mod probe;
mod stream;

pub(crate) use probe::{ProbeResult, probe};
pub(crate) use stream::{StreamOutcome, StreamParams, fetch_to_temp};
