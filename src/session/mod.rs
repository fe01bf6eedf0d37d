//! Manual duplex sessions spanning two invocations.
//!
//! A duplex document is captured in two passes: the front sides first, then the
//! back sides of the flipped stack in reverse order. The only state bridging the
//! two invocations is the odd-page manifest in the output directory.
//!
//! # Architecture
//!
//! * [`data`]: Per-invocation session and phase types.
//! * [`manifest`]: The checksummed, atomically written odd-page manifest.
//! * [`interleave`]: Reconstruction of reading order.
//! * [`controller`]: Protocol selection and the scan, convert, compile pipeline.

pub mod controller;
pub mod data;
pub mod interleave;
pub mod manifest;

pub use controller::{DuplexSessionController, Protocol, SessionOutcome, Toolchain};
pub use data::{Phase, ScanSession};
pub use interleave::{interleave, InterleaveError};
pub use manifest::{ManifestError, ManifestState, OddPageManifest, MANIFEST_VERSION};
