//! Whole-index operations: file and stream I/O, packager lowering,
//! bulk upgrades and NSVCA search.

use std::fs::read_to_string;
use std::io::Write;

use modulemd::{ModuleIndex, ModuleStream};
use modulemd_types::MdVersion;
use pretty_assertions::assert_eq;
use rstest::rstest;
use testresult::TestResult;

const V1_STREAM: &str = r#"---
document: modulemd
version: 1
data:
  name: legacy
  stream: stable
  version: 20190101000000
  summary: A legacy module
  description: A legacy module.
  eol: 2020-12-31
  license:
    module: [MIT]
  dependencies:
    buildrequires:
      platform: f33
    requires:
      platform: f33
...
"#;

const PACKAGER_V3: &str = r#"---
document: modulemd-packager
version: 3
data:
  name: authored
  stream: rolling
  summary: An authored module
  description: An authored module.
  license: [MIT]
  profiles:
    minimal:
      rpms: [authored]
      default: true
  configurations:
  - context: CTX1
    platform: f33
  - context: CTX2
    platform: f34
...
"#;

#[rstest]
fn file_roundtrip_with_tempfile() -> TestResult {
    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(V1_STREAM, true)?;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("modules.yaml");
    index.dump_to_file(&path)?;

    let mut reloaded = ModuleIndex::new();
    let failures = reloaded.update_from_file(&path, true)?;
    assert!(failures.is_empty());
    assert_eq!(index, reloaded);

    let on_disk = read_to_string(&path)?;
    assert!(on_disk.starts_with("---\n"));
    assert!(on_disk.ends_with("...\n"));
    Ok(())
}

#[rstest]
fn stream_and_custom_callback_loading() -> TestResult {
    let mut from_stream = ModuleIndex::new();
    from_stream.update_from_stream(V1_STREAM.as_bytes(), true)?;

    let mut remaining = V1_STREAM.as_bytes();
    let mut from_custom = ModuleIndex::new();
    from_custom.update_from_custom(
        |buf| {
            let n = remaining.len().min(buf.len()).min(7);
            buf[..n].copy_from_slice(&remaining[..n]);
            remaining = &remaining[n..];
            Ok(n)
        },
        true,
    )?;

    assert_eq!(from_stream, from_custom);
    Ok(())
}

#[rstest]
fn dump_to_stream_writes_the_same_bytes() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(V1_STREAM, true)?;

    let mut sink = Vec::new();
    index.dump_to_stream(&mut sink)?;
    sink.flush()?;
    assert_eq!(String::from_utf8(sink)?, index.dump_to_string()?);
    Ok(())
}

#[rstest]
fn index_wide_stream_upgrade() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(V1_STREAM, true)?;
    assert_eq!(index.stream_mdversion(), Some(MdVersion::One));

    index.upgrade_streams(MdVersion::Two)?;
    assert_eq!(index.stream_mdversion(), Some(MdVersion::Two));

    let module = index.get_module("legacy").expect("module was loaded");
    let ModuleStream::V2(stream) = &module.streams()[0] else {
        panic!("expected a v2 stream after the upgrade");
    };
    assert!(stream.servicelevels.contains_key("rawhide"));
    assert_eq!(stream.dependencies.len(), 1);

    index.upgrade_defaults(1)?;
    Ok(())
}

#[rstest]
fn packager_documents_lower_into_the_index() -> TestResult {
    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(PACKAGER_V3, true)?;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");

    let module = index.get_module("authored").expect("module was created");
    let ModuleStream::V2(stream) = &module.streams()[0] else {
        panic!("expected the packager document to lower to a v2 stream");
    };
    assert_eq!(stream.dependencies.len(), 2);

    let defaults = module.defaults().expect("default profile synthesizes defaults");
    assert_eq!(
        defaults.module_name(),
        Some("authored"),
    );
    Ok(())
}

#[rstest]
fn nsvca_search_across_modules() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(V1_STREAM, true)?;
    index.update_from_string(PACKAGER_V3, true)?;

    let hits = index.search_streams_by_glob("legacy:stable:*")?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].nsvca().to_string(), "legacy:stable:20190101000000");

    assert!(index.search_streams_by_glob("*:nosuchstream*")?.is_empty());
    Ok(())
}

#[rstest]
fn standalone_stream_reader_with_overrides() -> TestResult {
    let stream = ModuleStream::read_string(PACKAGER_V3, true, Some("renamed"), None)?;
    assert_eq!(stream.module_name(), Some("renamed"));
    assert_eq!(stream.stream_name(), Some("rolling"));
    assert_eq!(stream.mdversion(), MdVersion::Two);
    Ok(())
}
