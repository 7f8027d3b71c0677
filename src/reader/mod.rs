//! Reads the textual form back into an ABI graph.
//!
//! This is the inverse of `writer` and exists mainly as the round-trip
//! oracle: for any document `T` produced by the writer,
//! `write(read(T)) == T`.

mod build;
mod tree;

use crate::err::{DeserializationError, DeserializationResult as Result};
use crate::model::{Corpus, CorpusGroup, TranslationUnit};
use build::{build_translation_unit, check_version};
use log::debug;
use std::fs;
use std::path::Path;
use tree::{XmlElement, parse_document};

fn expect_root<'e>(root: &'e XmlElement, expected: &'static str) -> Result<&'e XmlElement> {
    if root.name != expected {
        return Err(DeserializationError::UnexpectedRoot {
            expected,
            found: root.name.clone(),
        });
    }
    Ok(root)
}

/// Read a document whose root is `abi-instr`.
pub fn read_translation_unit(input: &str) -> Result<TranslationUnit> {
    let root = parse_document(input)?;
    build_translation_unit(expect_root(&root, "abi-instr")?)
}

/// Read a document whose root is `abi-corpus`.
pub fn read_corpus(input: &str) -> Result<Corpus> {
    let root = parse_document(input)?;
    build_corpus(expect_root(&root, "abi-corpus")?)
}

/// Read a document whose root is `abi-corpus-group`.
pub fn read_corpus_group(input: &str) -> Result<CorpusGroup> {
    let root = parse_document(input)?;
    let root = expect_root(&root, "abi-corpus-group")?;
    check_version(root)?;

    let mut group = CorpusGroup::new(root.attr("path").unwrap_or_default());
    group.architecture = root.attr("architecture").unwrap_or_default().to_owned();

    for child in &root.children {
        match child.name.as_str() {
            "abi-corpus" => group.add(build_corpus(child)?),
            _ => return Err(root.unexpected_child(child)),
        }
    }

    debug!("read corpus group `{}` ({} corpora)", group.path, group.corpora.len());
    Ok(group)
}

pub fn read_corpus_from_path(path: impl AsRef<Path>) -> Result<Corpus> {
    let input = fs::read_to_string(path)?;
    read_corpus(&input)
}

fn build_corpus(root: &XmlElement) -> Result<Corpus> {
    check_version(root)?;

    let mut corpus = Corpus::new(root.attr("path").unwrap_or_default());
    corpus.architecture = root.attr("architecture").unwrap_or_default().to_owned();
    corpus.soname = root.attr("soname").unwrap_or_default().to_owned();

    for child in &root.children {
        match child.name.as_str() {
            "elf-needed" => {
                for dependency in &child.children {
                    if dependency.name != "dependency" {
                        return Err(child.unexpected_child(dependency));
                    }
                    corpus
                        .needed
                        .push(dependency.required_attr("name")?.to_owned());
                }
            }
            "abi-instr" => corpus.add(build_translation_unit(child)?),
            _ => return Err(root.unexpected_child(child)),
        }
    }

    debug!("read corpus `{}` ({} units)", corpus.path, corpus.units.len());
    Ok(corpus)
}
