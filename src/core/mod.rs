// Core modules implementing body limiting, envelopes, the response seam, and error modeling.
pub mod envelope;
pub mod error;
pub mod limit;
pub mod sink;
