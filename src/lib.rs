//! Canonical XML serialization of ABI graphs.
//!
//! An ABI graph describes the externally visible types, functions and
//! variables of a binary: basic types, namespaces, pointers and references,
//! enums, typedefs, classes with their bases and members, and function and
//! class templates. The graph shares nodes heavily and may be cyclic, so it
//! lives in an arena (`model::AbiArena`) and nodes refer to each other through
//! `NodeId` handles.
//!
//! `writer` turns a translation unit, corpus or corpus group into a
//! deterministic document in which every shared type is defined once and
//! referenced by id everywhere else. `reader` parses such a document back,
//! so that `write(read(T)) == T` can serve as a self-check.
//!
//! ```
//! use abixml::model::{BasicType, TranslationUnit};
//! use abixml::{WriteConfig, translation_unit_to_string};
//!
//! let mut unit = TranslationUnit::new("");
//! unit.add_decl(BasicType::new("int", 32));
//!
//! let xml = translation_unit_to_string(&unit, &WriteConfig::default()).unwrap();
//! assert_eq!(
//!     xml,
//!     "<abi-instr version='1.0'>\n  <type-decl name='int' size-in-bits='32' id='type-id-1'/>\n</abi-instr>\n"
//! );
//! ```

#[macro_use]
mod macros;

pub mod config;
pub mod err;
pub mod model;
pub mod reader;
pub mod writer;

pub use config::WriteConfig;
pub use err::{AbiXmlError, DeserializationError, Result, SerializationError};
pub use reader::{read_corpus, read_corpus_from_path, read_corpus_group, read_translation_unit};
#[cfg(feature = "multithreading")]
pub use writer::write_translation_units_parallel;
pub use writer::{
    WriteContext, corpus_group_to_string, corpus_to_string, translation_unit_to_string,
    write_corpus, write_corpus_group, write_corpus_to_path, write_translation_unit,
};
