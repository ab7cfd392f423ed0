//! Failure capture: bad subdocuments never abort a load.

use modulemd::{DocumentType, ModuleIndex};
use pretty_assertions::assert_eq;
use rstest::rstest;
use testresult::TestResult;

fn stream_doc(name: &str) -> String {
    format!(
        r#"---
document: modulemd
version: 2
data:
  name: {name}
  stream: latest
  version: 1
  summary: s
  description: d
  license:
    module: [MIT]
...
"#
    )
}

#[rstest]
fn bad_subdocument_is_tolerated() -> TestResult {
    let input = format!(
        "{}---\ndocument: modulemd\nversion: 2\ndata: \"not a map\"\n...\n{}",
        stream_doc("foo"),
        stream_doc("baz")
    );

    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(&input, true)?;

    assert_eq!(failures.len(), 1);
    let failure = &failures[0];
    assert_eq!(failure.document_type(), Some(DocumentType::ModuleStream));
    assert_eq!(failure.mdversion(), Some(2));
    assert!(failure.yaml().contains("not a map"));
    assert!(failure.error().is_some());

    assert_eq!(index.get_module_names(), ["baz", "foo"]);
    Ok(())
}

#[rstest]
fn each_invalid_subdocument_yields_one_failure() -> TestResult {
    let input = format!(
        "{}---\ndocument: modulemd\nversion: 9\ndata: {{}}\n...\n---\nversion: 1\ndata: {{}}\n...\n{}",
        stream_doc("one"),
        stream_doc("two")
    );

    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(&input, true)?;

    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|failure| failure.error().is_some()));
    assert_eq!(index.get_module_names(), ["one", "two"]);
    Ok(())
}

#[rstest]
fn strict_mode_rejects_unknown_attributes() -> TestResult {
    let input = r#"---
document: modulemd
version: 2
data:
  name: foo
  stream: latest
  version: 1
  summary: s
  description: d
  license:
    module: [MIT]
  yet_unknown_field: value
...
"#;

    let mut strict_index = ModuleIndex::new();
    let failures = strict_index.update_from_string(input, true)?;
    assert_eq!(failures.len(), 1);
    assert!(
        failures[0]
            .error()
            .unwrap()
            .to_string()
            .contains("yet_unknown_field")
    );

    // The permissive mode skips the unknown subtree instead.
    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(input, false)?;
    assert!(failures.is_empty());
    assert_eq!(index.get_module_names(), ["foo"]);
    Ok(())
}

#[rstest]
fn invalid_stream_becomes_a_failure_record() -> TestResult {
    // Parses fine, but validation finds the missing description.
    let input = r#"---
document: modulemd
version: 2
data:
  name: foo
  stream: latest
  version: 1
  summary: s
  license:
    module: [MIT]
...
"#;

    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(input, true)?;
    assert_eq!(failures.len(), 1);
    assert!(
        failures[0]
            .error()
            .unwrap()
            .to_string()
            .contains("description")
    );
    assert!(index.get_module_names().is_empty());
    Ok(())
}
