//! Code lens computation.
//!
//! [`document_lenses`] runs on every reparse and must stay cheap: it walks the
//! file's own declarations and performs at most two capped index queries per
//! class or virtual method. Reference counts are deferred to
//! [`resolve_lens`], which the client calls only for lenses it displays.

mod classify;
mod hierarchy;
mod location;
mod resolve;
mod types;
mod walker;

pub use classify::{Classification, classify};
pub use location::declaration_location;
pub use resolve::resolve_lens;
pub use types::{Lens, LensArgument, LensCommand, LensError, LensOptions, ResolveData, SHOW_REFERENCES};
pub use walker::document_lenses;
