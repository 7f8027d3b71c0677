use crate::model::{NodeId, NodeKind};
use thiserror::Error;

use std::io;

pub type Result<T> = std::result::Result<T, AbiXmlError>;

pub type SerializationResult<T> = std::result::Result<T, SerializationError>;
pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;

/// Errors raised while writing an ABI graph.
///
/// A failed write leaves a prefix of the document in the sink. Callers must
/// discard such output.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("node {node:?} is a {kind}, which cannot be emitted as a declaration")]
    UnrecognizedNode { node: NodeId, kind: NodeKind },

    #[error("node handle {node:?} does not belong to this translation unit")]
    DanglingHandle { node: NodeId },

    #[error("node {node:?} should be a {expected}, found a {found}")]
    UnexpectedKind {
        node: NodeId,
        expected: &'static str,
        found: NodeKind,
    },

    #[error("An I/O error has occurred while writing: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to persist output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Errors raised while reading the textual form back into a graph.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("An I/O error has occurred while reading: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Expected root element `{expected}`, found `{found}`")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("Unexpected element `{found}` inside `{parent}`")]
    UnexpectedElement { parent: String, found: String },

    #[error("Element `{element}` is missing attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("Element `{element}` has invalid value `{value}` for attribute `{attribute}`")]
    InvalidAttributeValue {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("Element `{element}` has unsupported format version `{version}`")]
    UnsupportedVersion { element: String, version: String },

    #[error("Element `{element}` is missing its `{child}` child")]
    MissingChild {
        element: String,
        child: &'static str,
    },

    #[error("Reference to undefined id `{id}`")]
    UnresolvedId { id: String },

    #[error("Id `{id}` is defined more than once")]
    DuplicateId { id: String },

    #[error("Id `{id}` refers to a {found}, expected a {expected}")]
    IdKindMismatch {
        id: String,
        expected: &'static str,
        found: NodeKind,
    },

    #[error("Unbalanced document: {message}")]
    Unbalanced { message: String },
}

#[derive(Debug, Error)]
pub enum AbiXmlError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
}
