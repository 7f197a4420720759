//! ECMA-335 metadata model: heaps, tables, signatures and the two root
//! containers.
//!
//! The build path runs through [`cilassembly::CilAssembly`] and the read path
//! through [`cilview::CilView`]; everything else in this module is the shared
//! machinery both sides use — the [`heaps`] stores, the [`tables`] catalogue
//! with its index planner, the [`signatures`] codec, [`marshalling`]
//! descriptors and the physical [`streams`] layer.

pub mod cilassembly;
pub mod cilview;
pub mod customattributes;
pub mod heaps;
pub mod marshalling;
pub mod signatures;
pub mod streams;
pub mod tables;
pub mod token;
