//! Purpose: Define the stable public Rust API boundary for readrespond.
//! Exports: The codec plus the types handlers touch around it.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path to core types.

mod codec;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::envelope::Envelope;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::sink::{ResponseRecorder, ResponseWriter};
pub use codec::{Codec, CodecConfig, JSON_CONTENT_TYPE};
