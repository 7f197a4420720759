// Copyright 2025-2026 The cilforge contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! # cilforge
//!
//! A pure-Rust serialization engine for ECMA-335 CLI metadata — the `#~`
//! table stream and its four sibling heaps (`#Strings`, `#US`, `#Blob`,
//! `#GUID`) that make up the metadata section of a managed PE image.
//!
//! The crate covers both directions:
//!
//! - **Building**: client code assembles a descriptor graph with
//!   [`CilAssembly`] (module, types, fields, methods, params, properties,
//!   events, P/Invoke maps, custom attributes, …), then commits it with
//!   [`CilAssembly::finalize`] and serializes it with [`CilAssembly::write`].
//!   The engine normalizes the graph into the fixed table catalogue, interns
//!   the heaps, encodes every signature blob, sorts the tables the format
//!   requires to be sorted, plans 2-vs-4-byte column widths and emits the
//!   physical stream.
//! - **Reading**: [`CilView::read`] parses a serialized metadata root back
//!   into row tables and resolved descriptors, deferring signature blob
//!   decoding until a descriptor is asked for it.
//!
//! The PE/COFF container, IL method bodies and image hashing are out of
//! scope; this crate consumes and produces the metadata root only.
//!
//! # Quick start
//!
//! ```rust
//! use cilforge::{CilAssembly, CilView};
//! use cilforge::metadata::signatures::{SignatureField, TypeSignature};
//!
//! let mut asm = CilAssembly::new("m.dll");
//! let class = asm.add_type("MyNamespace", "C", 0x0010_0001)?;
//! asm.add_field(class, "a", 0x0006, SignatureField::new(TypeSignature::I4))?;
//! asm.finalize()?;
//! let image = asm.write()?;
//!
//! let view = CilView::read(&image)?;
//! assert_eq!(view.types().len(), 1);
//! # Ok::<(), cilforge::Error>(())
//! ```

#[macro_use]
mod error;
pub mod file;
pub mod metadata;

pub use error::Error;
pub use metadata::cilassembly::{BuildState, CilAssembly};
pub use metadata::cilview::CilView;
pub use metadata::token::Token;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenient re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::metadata::cilassembly::{
        AssemblyDesc, BuildState, CilAssembly, ConstantValue, MethodRef, ResolutionScope,
        TypeRefOrDef,
    };
    pub use crate::metadata::cilview::CilView;
    pub use crate::metadata::heaps::{Blob, Guid, Strings, UserStrings};
    pub use crate::metadata::signatures::{
        SignatureField, SignatureLocalVariables, SignatureMethod, SignatureProperty, TypeSignature,
    };
    pub use crate::metadata::tables::{
        CodedIndex, CodedIndexType, FieldAttributes, MethodAttributes, MethodImplAttributes,
        ParamAttributes, TableId, TypeAttributes,
    };
    pub use crate::metadata::token::Token;
    pub use crate::Result;
}
