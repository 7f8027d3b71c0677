mod fixtures;
use fixtures::*;

use abixml::model::*;
use abixml::{
    DeserializationError, SerializationError, WriteConfig, corpus_group_to_string, corpus_to_string, read_corpus,
    read_corpus_from_path, read_corpus_group, read_translation_unit, translation_unit_to_string,
    write_corpus_to_path,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn write(unit: &TranslationUnit) -> String {
    translation_unit_to_string(unit, &WriteConfig::default()).expect("serialization to succeed")
}

#[test]
fn test_rich_unit_round_trips() {
    ensure_env_logger_initialized();
    let first = write(&rich_unit());
    let reread = read_translation_unit(&first).expect("document to parse");
    assert_eq!(write(&reread), first);
}

#[test]
fn test_rich_unit_output_shape() {
    ensure_env_logger_initialized();
    let out = write(&rich_unit());

    assert!(out.starts_with(
        "<abi-instr version='1.0' address-size='64' path='src/widget.cc' language='LANG_C_plus_plus'>\n"
    ));
    assert!(out.contains(
        "<type-decl name='int' size-in-bits='32' alignment-in-bits='32' id='type-id-1'/>"
    ));
    assert!(out.contains("<qualified-type-def type-id='type-id-2' const='yes' id='type-id-3'/>"));
    assert!(out.contains("<enumerator name='blue' value='-1'/>"));
    assert!(out.contains(
        "<enum-decl name='color' filepath='include/widget.h' line='10' column='7' id='type-id-6'>"
    ));
    assert!(out.contains("<base-class access='public' layout-offset-in-bits='0' is-virtual='yes'"));
    assert!(out.contains("<member-function access='public' const='yes' vtable-offset='2'>"));
    assert!(out.contains("<parameter is-variadic='yes'/>"));
    assert!(out.contains("<function-template-decl id='fn-tmpl-id-1'>"));
    assert!(out.contains("<class-template-decl id='class-tmpl-id-1'>"));
    assert!(out.contains(
        "<function-template-decl id='fn-tmpl-id-2' filepath='src/widget.cc' line='42' column='1' visibility='hidden' binding='local'>"
    ));
    assert!(out.ends_with("</abi-instr>\n"));

    // Each shared node is defined exactly once.
    assert_eq!(out.matches(" id='type-id-1'").count(), 1);
    assert_eq!(out.matches("<class-decl name='widget'").count(), 2);
}

#[test]
fn test_handwritten_document_is_canonical() {
    ensure_env_logger_initialized();
    let doc = indoc! {"
        <abi-instr version='1.0' address-size='64' path='s.cc'>
          <type-decl name='int' size-in-bits='32' id='type-id-1'/>
          <class-decl name='B' size-in-bits='8' id='type-id-2'/>
          <class-decl name='S' size-in-bits='32' is-struct='yes' id='type-id-3'>
            <base-class access='public' layout-offset-in-bits='0' type-id='type-id-2'/>
            <data-member access='public' layout-offset-in-bits='0'>
              <var-decl name='m' type-id='type-id-1'/>
            </data-member>
            <member-function access='public' const='yes'>
              <function-decl name='get' mangled-name='_ZNK1S3getEv'>
                <return type-id='type-id-1'/>
              </function-decl>
            </member-function>
          </class-decl>
          <function-template-decl id='fn-tmpl-id-1'>
            <template-type-parameter id='type-id-4' name='T'/>
            <function-decl name='max'>
              <parameter type-id='type-id-4' name='a'/>
              <parameter type-id='type-id-4' name='b'/>
              <return type-id='type-id-4'/>
            </function-decl>
          </function-template-decl>
        </abi-instr>
    "};

    let unit = read_translation_unit(doc).expect("document to parse");
    assert_eq!(unit.path, "s.cc");
    assert_eq!(unit.address_size, 64);
    assert_eq!(unit.decls().len(), 4);

    // The method regains its implicit first parameter.
    let get = unit
        .decls()
        .iter()
        .find_map(|&id| match unit.arena().get(id) {
            Some(Node::Class(class)) if class.name == "S" => Some(class.member_functions[0].function),
            _ => None,
        })
        .expect("class S");
    match unit.arena().get(get) {
        Some(Node::Function(function)) => {
            assert!(function.is_method);
            assert_eq!(function.parameters.len(), 1);
        }
        other => panic!("unexpected node {:?}", other),
    }

    assert_eq!(write(&unit), doc);
}

#[test]
fn test_template_parameter_referenced_before_template() {
    ensure_env_logger_initialized();
    let doc = indoc! {"
        <abi-instr version='1.0'>
          <var-decl name='g' type-id='type-id-1'/>
          <function-template-decl id='fn-tmpl-id-1'>
            <template-type-parameter type-id='type-id-1' name='T'/>
            <function-decl name='f'>
              <parameter type-id='type-id-1'/>
            </function-decl>
          </function-template-decl>
        </abi-instr>
    "};

    let unit = read_translation_unit(doc).expect("document to parse");
    assert_eq!(write(&unit), doc);
}

#[test]
fn test_corpus_round_trips() {
    ensure_env_logger_initialized();
    let mut corpus = Corpus::new("libwidget.so");
    corpus.architecture = "elf-amd-x86_64".to_owned();
    corpus.soname = "libwidget.so.2".to_owned();
    corpus.needed = vec!["libc.so.6".to_owned(), "libm.so.6".to_owned()];
    corpus.add(rich_unit());
    corpus.add(rich_unit());

    let config = WriteConfig::default();
    let first = corpus_to_string(&corpus, &config).expect("serialization to succeed");
    let reread = read_corpus(&first).expect("document to parse");

    assert_eq!(reread.needed, corpus.needed);
    assert_eq!(reread.units.len(), 2);
    assert_eq!(
        corpus_to_string(&reread, &config).expect("serialization to succeed"),
        first
    );

    // The second unit continues the numbering of the first.
    assert_eq!(first.matches(" id='fn-tmpl-id-4'").count(), 1);
}

#[test]
fn test_corpus_group_round_trips() {
    ensure_env_logger_initialized();
    let mut group = CorpusGroup::new("vmlinux");
    group.architecture = "elf-arm-aarch64".to_owned();
    let mut kernel = Corpus::new("vmlinux");
    kernel.add(rich_unit());
    group.add(kernel);
    let mut module = Corpus::new("net/foo.ko");
    module.add(rich_unit());
    group.add(module);

    let config = WriteConfig::default();
    let first = corpus_group_to_string(&group, &config).expect("serialization to succeed");
    let reread = read_corpus_group(&first).expect("document to parse");

    assert_eq!(reread.corpora.len(), 2);
    assert_eq!(reread.architecture, "elf-arm-aarch64");
    assert_eq!(
        corpus_group_to_string(&reread, &config).expect("serialization to succeed"),
        first
    );
}

#[test]
fn test_write_corpus_to_path() {
    ensure_env_logger_initialized();
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("libwidget.abi");

    let mut corpus = Corpus::new("libwidget.so");
    corpus.add(rich_unit());

    write_corpus_to_path(&corpus, &WriteConfig::default(), &path).expect("write to succeed");
    let reread = read_corpus_from_path(&path).expect("file to parse");

    let config = WriteConfig::default();
    assert_eq!(
        corpus_to_string(&reread, &config).expect("serialization to succeed"),
        std::fs::read_to_string(&path).expect("file to exist")
    );
}

#[test]
fn test_failed_write_leaves_no_file_behind() {
    ensure_env_logger_initialized();
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("broken.abi");

    let mut unit = TranslationUnit::new("broken.c");
    unit.add_decl(BasicType::new("int", 32));
    // Template parameters cannot be top-level declarations.
    unit.add_decl(TypeTemplateParameter::new("T"));
    let mut corpus = Corpus::new("libbroken.so");
    corpus.add(unit);

    assert!(matches!(
        write_corpus_to_path(&corpus, &WriteConfig::default(), &path),
        Err(SerializationError::UnrecognizedNode { .. })
    ));
    assert!(!path.exists());

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .expect("readable directory")
        .collect();
    assert_eq!(entries.len(), 0);
}

#[test]
fn test_unresolved_id_is_rejected() {
    ensure_env_logger_initialized();
    let doc = "<abi-instr version='1.0'>\n  <var-decl name='v' type-id='type-id-9'/>\n</abi-instr>\n";
    match read_translation_unit(doc) {
        Err(DeserializationError::UnresolvedId { id }) => assert_eq!(id, "type-id-9"),
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_duplicate_id_is_rejected() {
    ensure_env_logger_initialized();
    let doc = indoc! {"
        <abi-instr version='1.0'>
          <type-decl name='int' size-in-bits='32' id='type-id-1'/>
          <type-decl name='long' size-in-bits='64' id='type-id-1'/>
        </abi-instr>
    "};
    assert!(matches!(
        read_translation_unit(doc),
        Err(DeserializationError::DuplicateId { .. })
    ));
}

#[test]
fn test_wrong_root_is_rejected() {
    ensure_env_logger_initialized();
    let doc = "<abi-corpus version='1.0'/>\n";
    assert!(matches!(
        read_translation_unit(doc),
        Err(DeserializationError::UnexpectedRoot {
            expected: "abi-instr",
            ..
        })
    ));
    assert!(read_corpus(doc).is_ok());
}

#[test]
fn test_malformed_version_is_rejected() {
    ensure_env_logger_initialized();
    assert!(matches!(
        read_translation_unit("<abi-instr version='one'/>"),
        Err(DeserializationError::InvalidAttributeValue {
            attribute: "version",
            ..
        })
    ));
    assert!(matches!(
        read_translation_unit("<abi-instr/>"),
        Err(DeserializationError::MissingAttribute {
            attribute: "version",
            ..
        })
    ));
}

#[test]
fn test_unsupported_major_version_is_rejected() {
    ensure_env_logger_initialized();
    match read_translation_unit("<abi-instr version='2.0'/>") {
        Err(DeserializationError::UnsupportedVersion { element, version }) => {
            assert_eq!(element, "abi-instr");
            assert_eq!(version, "2.0");
        }
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }

    // Minor versions only add optional attributes.
    assert!(read_translation_unit("<abi-instr version='1.7'/>").is_ok());
    assert!(matches!(
        read_corpus("<abi-corpus version='0.9'/>"),
        Err(DeserializationError::UnsupportedVersion { .. })
    ));
}

#[test]
fn test_unknown_element_is_rejected() {
    ensure_env_logger_initialized();
    let doc = "<abi-instr version='1.0'>\n  <array-type-def id='type-id-1'/>\n</abi-instr>\n";
    assert!(matches!(
        read_translation_unit(doc),
        Err(DeserializationError::UnexpectedElement { .. })
    ));
}
