//! Serialization of ABI graphs to their canonical XML form.
//!
//! The entry points take a translation unit, a corpus or a corpus group, a
//! `WriteConfig` and an `io::Write` sink. Each call builds a fresh
//! `WriteContext` (sink, config, `IdRegistry`) and drops it when done, so ids
//! are stable within one document and nothing carries over between calls.
//!
//! Output is written straight to the sink. On error the sink holds an
//! incomplete document; `write_corpus_to_path` shows the intended handling,
//! writing into a temporary file that only replaces the target on success.

mod attrs;
mod emit;
mod ids;

pub use ids::{IdNamespace, IdRegistry, NodeKey};

use crate::config::WriteConfig;
use crate::err::SerializationResult as Result;
use crate::model::{Corpus, CorpusGroup, TranslationUnit};
use attrs::{write_attr, write_indent, write_nonzero};
use emit::UnitEmitter;
use log::debug;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// State of one serialization session.
pub struct WriteContext<'c, W: Write> {
    pub(crate) out: W,
    pub(crate) ids: IdRegistry,
    config: &'c WriteConfig,
    units_written: u32,
}

impl<'c, W: Write> WriteContext<'c, W> {
    pub fn new(out: W, config: &'c WriteConfig) -> Self {
        WriteContext {
            out,
            ids: IdRegistry::new(),
            config,
            units_written: 0,
        }
    }

    pub fn config(&self) -> &WriteConfig {
        self.config
    }

    pub fn ids(&self) -> &IdRegistry {
        &self.ids
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn write_version(&mut self) -> Result<()> {
        write!(
            self.out,
            " version='{}.{}'",
            self.config.get_format_major_version(),
            self.config.get_format_minor_version()
        )?;
        Ok(())
    }

    fn write_optional_str(&mut self, key: &str, value: &str) -> Result<()> {
        if !value.is_empty() {
            write_attr(&mut self.out, key, value)?;
        }
        Ok(())
    }

    /// Write one `abi-instr` element and everything the unit owns.
    pub fn write_translation_unit(&mut self, unit: &TranslationUnit, indent: usize) -> Result<()> {
        debug!(
            "writing translation unit `{}` ({} decls)",
            unit.path,
            unit.decls().len()
        );
        let unit_key = self.units_written;
        self.units_written += 1;

        write_indent(&mut self.out, indent)?;
        self.out.write_all(b"<abi-instr")?;
        self.write_version()?;
        write_nonzero(&mut self.out, "address-size", u64::from(unit.address_size))?;
        self.write_optional_str("path", &unit.path)?;
        if let Some(language) = unit.language.as_deref() {
            write_attr(&mut self.out, "language", language)?;
        }

        if unit.is_empty() {
            self.out.write_all(b"/>\n")?;
            return Ok(());
        }
        self.out.write_all(b">\n")?;

        let nested = indent + self.config.get_xml_element_indent();
        let mut emitter = UnitEmitter::new(self, unit, unit_key);
        for &decl in unit.decls() {
            emitter.write_decl(decl, nested)?;
        }

        write_indent(&mut self.out, indent)?;
        self.out.write_all(b"</abi-instr>\n")?;
        Ok(())
    }

    pub fn write_corpus(&mut self, corpus: &Corpus, indent: usize) -> Result<()> {
        debug!(
            "writing corpus `{}` ({} translation units)",
            corpus.path,
            corpus.units.len()
        );
        write_indent(&mut self.out, indent)?;
        self.out.write_all(b"<abi-corpus")?;
        self.write_version()?;
        self.write_optional_str("path", &corpus.path)?;
        self.write_optional_str("architecture", &corpus.architecture)?;
        self.write_optional_str("soname", &corpus.soname)?;

        if corpus.is_empty() {
            self.out.write_all(b"/>\n")?;
            return Ok(());
        }
        self.out.write_all(b">\n")?;

        let step = self.config.get_xml_element_indent();
        let nested = indent + step;

        if !corpus.needed.is_empty() {
            write_indent(&mut self.out, nested)?;
            self.out.write_all(b"<elf-needed>\n")?;
            for dependency in &corpus.needed {
                write_indent(&mut self.out, nested + step)?;
                self.out.write_all(b"<dependency")?;
                write_attr(&mut self.out, "name", dependency)?;
                self.out.write_all(b"/>\n")?;
            }
            write_indent(&mut self.out, nested)?;
            self.out.write_all(b"</elf-needed>\n")?;
        }

        for unit in &corpus.units {
            self.write_translation_unit(unit, nested)?;
        }

        write_indent(&mut self.out, indent)?;
        self.out.write_all(b"</abi-corpus>\n")?;
        Ok(())
    }

    pub fn write_corpus_group(&mut self, group: &CorpusGroup, indent: usize) -> Result<()> {
        debug!(
            "writing corpus group `{}` ({} corpora)",
            group.path,
            group.corpora.len()
        );
        write_indent(&mut self.out, indent)?;
        self.out.write_all(b"<abi-corpus-group")?;
        self.write_version()?;
        self.write_optional_str("path", &group.path)?;
        self.write_optional_str("architecture", &group.architecture)?;

        if group.is_empty() {
            self.out.write_all(b"/>\n")?;
            return Ok(());
        }
        self.out.write_all(b">\n")?;

        let nested = indent + self.config.get_xml_element_indent();
        for corpus in &group.corpora {
            self.write_corpus(corpus, nested)?;
        }

        write_indent(&mut self.out, indent)?;
        self.out.write_all(b"</abi-corpus-group>\n")?;
        Ok(())
    }
}

/// Serialize one translation unit into `out`.
pub fn write_translation_unit<W: Write>(
    unit: &TranslationUnit,
    config: &WriteConfig,
    out: W,
) -> Result<W> {
    let mut ctx = WriteContext::new(out, config);
    ctx.write_translation_unit(unit, 0)?;
    ctx.out.flush()?;
    Ok(ctx.into_writer())
}

/// Serialize a corpus, sharing one id registry across all of its units.
pub fn write_corpus<W: Write>(corpus: &Corpus, config: &WriteConfig, out: W) -> Result<W> {
    let mut ctx = WriteContext::new(out, config);
    ctx.write_corpus(corpus, 0)?;
    ctx.out.flush()?;
    Ok(ctx.into_writer())
}

pub fn write_corpus_group<W: Write>(
    group: &CorpusGroup,
    config: &WriteConfig,
    out: W,
) -> Result<W> {
    let mut ctx = WriteContext::new(out, config);
    ctx.write_corpus_group(group, 0)?;
    ctx.out.flush()?;
    Ok(ctx.into_writer())
}

/// Every byte comes from `&str` values and ASCII markup, so invalid UTF-8
/// here means an emitter wrote raw bytes.
fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

pub fn translation_unit_to_string(unit: &TranslationUnit, config: &WriteConfig) -> Result<String> {
    into_string(write_translation_unit(unit, config, Vec::new())?)
}

pub fn corpus_to_string(corpus: &Corpus, config: &WriteConfig) -> Result<String> {
    into_string(write_corpus(corpus, config, Vec::new())?)
}

pub fn corpus_group_to_string(group: &CorpusGroup, config: &WriteConfig) -> Result<String> {
    into_string(write_corpus_group(group, config, Vec::new())?)
}

/// Serialize a corpus to `path`.
///
/// The document is written to a temporary file next to `path` and moved into
/// place only once it is complete, so a failed write never leaves a truncated
/// file behind.
pub fn write_corpus_to_path(
    corpus: &Corpus,
    config: &WriteConfig,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = tempfile::NamedTempFile::new_in(dir)?;
    let writer = write_corpus(corpus, config, BufWriter::new(temp))?;
    let temp = writer.into_inner().map_err(|e| e.into_error())?;
    temp.persist(path)?;

    debug!("wrote corpus `{}` to {}", corpus.path, path.display());
    Ok(())
}

/// Serialize independent translation units concurrently.
///
/// Each unit gets its own `WriteContext`, so ids restart at 1 in every
/// output. Results are returned in input order.
#[cfg(feature = "multithreading")]
pub fn write_translation_units_parallel(
    units: &[TranslationUnit],
    config: &WriteConfig,
) -> Vec<Result<Vec<u8>>> {
    use rayon::prelude::*;

    units
        .par_iter()
        .map(|unit| write_translation_unit(unit, config, Vec::new()))
        .collect()
}
