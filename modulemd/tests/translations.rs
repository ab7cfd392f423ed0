//! Translation association and localized lookups through the index.

use std::str::FromStr;

use modulemd::ModuleIndex;
use modulemd_types::Locale;
use pretty_assertions::assert_eq;
use rstest::rstest;
use testresult::TestResult;

const INDEX: &str = r#"---
document: modulemd
version: 2
data:
  name: foo
  stream: "1.0"
  version: 1
  summary: An example module
  description: An example module.
  license:
    module: [MIT]
  profiles:
    default:
      description: The default set
      rpms: [bar]
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
      description: barevny
      profiles:
        default: vychozi sada
...
"#;

#[rstest]
#[case("cs_CZ", "ahoj")]
#[case("C", "An example module")]
#[case("en_US", "An example module")]
fn localized_summary_lookup(#[case] locale: &str, #[case] expected: &str) -> TestResult {
    let mut index = ModuleIndex::new();
    let failures = index.update_from_string(INDEX, true)?;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");

    let module = index.get_module("foo").expect("module was loaded");
    let stream = &module.streams()[0];
    let locale = Locale::from_str(locale)?;

    assert_eq!(module.localized_summary(stream, &locale), Some(expected));
    Ok(())
}

#[rstest]
fn localized_profile_description_lookup() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(INDEX, true)?;

    let module = index.get_module("foo").expect("module was loaded");
    let stream = &module.streams()[0];
    let translation = module.translation("1.0");

    assert_eq!(
        stream.localized_profile_description(
            translation,
            &Locale::from_str("cs_CZ")?,
            "default"
        ),
        Some("vychozi sada")
    );
    assert_eq!(
        stream.localized_profile_description(
            translation,
            &Locale::from_str("en_US")?,
            "default"
        ),
        Some("The default set")
    );
    Ok(())
}

#[rstest]
fn newest_translation_wins_on_repeated_association() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(INDEX, true)?;

    let older = r#"---
document: modulemd-translations
version: 1
data:
  module: foo
  stream: "1.0"
  modified: 201901010000
  translations:
    cs_CZ:
      summary: stary pozdrav
...
"#;
    let failures = index.update_from_string(older, true)?;
    assert!(failures.is_empty());

    let module = index.get_module("foo").expect("module was loaded");
    assert_eq!(module.translation("1.0").map(|t| t.modified), Some(202001012020));
    Ok(())
}

#[rstest]
fn removed_module_invalidates_association() -> TestResult {
    let mut index = ModuleIndex::new();
    index.update_from_string(INDEX, true)?;
    assert!(index.remove_module("foo"));
    assert!(index.get_module("foo").is_none());
    Ok(())
}
