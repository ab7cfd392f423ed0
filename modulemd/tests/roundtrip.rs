//! Round-trip and emission determinism across the document family.

use modulemd::ModuleIndex;
use pretty_assertions::assert_eq;
use rstest::rstest;
use testresult::TestResult;

const STREAM_V2: &str = r#"---
document: modulemd
version: 2
data:
  name: foo
  stream: "1.0"
  version: 20230101000000
  context: abcdef12
  summary: s
  description: d
  license:
    module: [MIT]
...
"#;

const FULL_INDEX: &str = r#"---
document: modulemd-defaults
version: 1
data:
  module: foo
  stream: "1.0"
  profiles:
    "1.0": [default]
...
---
document: modulemd
version: 2
data:
  name: foo
  stream: "1.0"
  version: 20230101000000
  context: abcdef12
  summary: An example module
  description: An example module.
  servicelevels:
    rawhide:
      eol: 2033-08-01
  license:
    module: [MIT]
    content: [Beerware, GPLv2+]
  xmd:
    owner: infra-team
    build:
      jobs: 4
  dependencies:
  - buildrequires:
      platform: [f33]
    requires:
      platform: [f33]
  references:
    community: https://www.example.org/
    documentation: https://www.example.org/docs
    tracker: https://www.example.org/bugs
  profiles:
    default:
      description: The default set
      rpms: [bar, bar-extras]
  api:
    rpms: [bar]
  filter:
    rpms: [baz-nonfoo]
  buildopts:
    rpms:
      macros: |
        %demomacro 1
      whitelist: [fooscl-one]
    arches: [i686, x86_64]
  components:
    rpms:
      bar:
        rationale: Present in the repository.
        repository: https://pagure.io/bar.git
        ref: 26ca0c0
        buildorder: 4
        arches: [i686, x86_64]
        multilib: [x86_64]
    modules:
      includedmodule:
        rationale: Included in the stack.
        repository: https://pagure.io/includedmodule.git
        ref: somecoolbranchname
        buildorder: 100
  artifacts:
    rpms:
    - bar-0:1.23-1.module_deadbeef.x86_64
...
---
document: modulemd-translations
version: 1
data:
  module: foo
  stream: "1.0"
  modified: 202001012020
  translations:
    cs_CZ:
      summary: ahoj
...
---
document: modulemd-obsoletes
version: 1
data:
  modified: 202201241155
  module: foo
  stream: "1.0"
  message: Stream is EOL.
...
"#;

#[rstest]
#[case::minimal_stream(STREAM_V2)]
#[case::full_index(FULL_INDEX)]
fn parse_emit_parse_is_identity(#[case] input: &str) -> TestResult {
    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(input, true)?;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");

    let emitted = index.dump_to_string()?;

    let mut reparsed = ModuleIndex::new();
    let failures = reparsed.update_from_string(&emitted, true)?;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");

    assert_eq!(index, reparsed);
    Ok(())
}

#[rstest]
#[case::minimal_stream(STREAM_V2)]
#[case::full_index(FULL_INDEX)]
fn emission_is_deterministic(#[case] input: &str) -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(input, true)?;

    let first = index.dump_to_string()?;
    let copy = index.clone();
    assert_eq!(first, copy.dump_to_string()?);

    // A full cycle through the emitter keeps the bytes stable too.
    let mut reparsed = ModuleIndex::new();
    reparsed.update_from_string(&first, true)?;
    assert_eq!(first, reparsed.dump_to_string()?);
    Ok(())
}

#[rstest]
fn stream_scalar_stays_double_quoted() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(STREAM_V2, true)?;

    let emitted = index.dump_to_string()?;
    assert!(
        emitted.contains("stream: \"1.0\"\n"),
        "stream value lost its quoting:\n{emitted}"
    );
    Ok(())
}

#[rstest]
fn copy_independence() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(FULL_INDEX, true)?;

    let copy = index.clone();
    index.remove_module("foo");

    assert!(index.get_module("foo").is_none());
    assert!(copy.get_module("foo").is_some());
    Ok(())
}
