//! Buildable component inputs of a module stream.

use std::collections::BTreeSet;

use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// An RPM component: a source package built as part of the stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ComponentRpm {
    /// The component name.
    pub name: String,
    /// Why the component is part of the stream.
    pub rationale: Option<String>,
    /// Explicit numeric build ordering.
    ///
    /// Mutually exclusive with `buildafter` across the whole stream.
    pub buildorder: Option<i64>,
    /// Names of components that must be built before this one.
    pub buildafter: BTreeSet<String>,
    /// Whether the produced binaries stay internal to the build.
    pub buildonly: bool,
    /// The commit, branch or tag to build from.
    pub git_ref: Option<String>,
    /// The VCS repository the component is fetched from.
    pub repository: Option<String>,
    /// The lookaside cache URL for sources.
    pub cache: Option<String>,
    /// Architectures the component is built for.
    ///
    /// Must stay within the stream's `buildopts` arches when those are
    /// restricted.
    pub arches: BTreeSet<String>,
    /// Architectures the component delivers multilib variants for.
    pub multilib: BTreeSet<String>,
}

impl ComponentRpm {
    /// Creates an empty [`ComponentRpm`] with the given name.
    pub fn new(name: impl Into<String>) -> ComponentRpm {
        ComponentRpm {
            name: name.into(),
            ..ComponentRpm::default()
        }
    }

    /// Parses the body of one `components.rpms:` entry.
    pub(crate) fn parse(
        name: String,
        value: &Value,
        path: &str,
        strict: bool,
    ) -> Result<ComponentRpm, Error> {
        let mut component = ComponentRpm::new(name);
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "rationale" => component.rationale = Some(parse::string(raw_value, &key_path)?),
                "buildorder" => component.buildorder = Some(parse::i64(raw_value, &key_path)?),
                "buildafter" => component.buildafter = parse::string_set(raw_value, &key_path)?,
                "buildonly" => component.buildonly = parse::bool(raw_value, &key_path)?,
                "ref" => component.git_ref = Some(parse::string(raw_value, &key_path)?),
                "repository" => component.repository = Some(parse::string(raw_value, &key_path)?),
                "cache" => component.cache = Some(parse::string(raw_value, &key_path)?),
                "arches" => component.arches = parse::string_set(raw_value, &key_path)?,
                "multilib" => component.multilib = parse::string_set(raw_value, &key_path)?,
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(component)
    }

    /// Emits this component as one `components.rpms:` entry.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.begin_map(&self.name);
        if let Some(rationale) = &self.rationale {
            writer.entry("rationale", rationale);
        }
        if let Some(repository) = &self.repository {
            writer.entry("repository", repository);
        }
        if let Some(cache) = &self.cache {
            writer.entry("cache", cache);
        }
        if let Some(git_ref) = &self.git_ref {
            writer.entry("ref", git_ref);
        }
        if let Some(buildorder) = self.buildorder {
            writer.i64_entry("buildorder", buildorder);
        }
        if !self.buildafter.is_empty() {
            writer.string_seq("buildafter", self.buildafter.iter().map(String::as_str));
        }
        if self.buildonly {
            writer.bool_entry("buildonly", true);
        }
        if !self.arches.is_empty() {
            writer.string_seq("arches", self.arches.iter().map(String::as_str));
        }
        if !self.multilib.is_empty() {
            writer.string_seq("multilib", self.multilib.iter().map(String::as_str));
        }
        writer.end_map();
    }
}

/// A module component: another module included in the stream's build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ComponentModule {
    /// The component name.
    pub name: String,
    /// Why the component is part of the stream.
    pub rationale: Option<String>,
    /// Explicit numeric build ordering.
    ///
    /// Mutually exclusive with `buildafter` across the whole stream.
    pub buildorder: Option<i64>,
    /// Names of components that must be built before this one.
    pub buildafter: BTreeSet<String>,
    /// Whether the produced binaries stay internal to the build.
    pub buildonly: bool,
    /// The commit, branch or tag to build from.
    pub git_ref: Option<String>,
    /// The VCS repository the component is fetched from.
    pub repository: Option<String>,
}

impl ComponentModule {
    /// Creates an empty [`ComponentModule`] with the given name.
    pub fn new(name: impl Into<String>) -> ComponentModule {
        ComponentModule {
            name: name.into(),
            ..ComponentModule::default()
        }
    }

    /// Parses the body of one `components.modules:` entry.
    pub(crate) fn parse(
        name: String,
        value: &Value,
        path: &str,
        strict: bool,
    ) -> Result<ComponentModule, Error> {
        let mut component = ComponentModule::new(name);
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "rationale" => component.rationale = Some(parse::string(raw_value, &key_path)?),
                "buildorder" => component.buildorder = Some(parse::i64(raw_value, &key_path)?),
                "buildafter" => component.buildafter = parse::string_set(raw_value, &key_path)?,
                "buildonly" => component.buildonly = parse::bool(raw_value, &key_path)?,
                "ref" => component.git_ref = Some(parse::string(raw_value, &key_path)?),
                "repository" => component.repository = Some(parse::string(raw_value, &key_path)?),
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(component)
    }

    /// Emits this component as one `components.modules:` entry.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.begin_map(&self.name);
        if let Some(rationale) = &self.rationale {
            writer.entry("rationale", rationale);
        }
        if let Some(repository) = &self.repository {
            writer.entry("repository", repository);
        }
        if let Some(git_ref) = &self.git_ref {
            writer.entry("ref", git_ref);
        }
        if let Some(buildorder) = self.buildorder {
            writer.i64_entry("buildorder", buildorder);
        }
        if !self.buildafter.is_empty() {
            writer.string_seq("buildafter", self.buildafter.iter().map(String::as_str));
        }
        if self.buildonly {
            writer.bool_entry("buildonly", true);
        }
        writer.end_map();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    fn component_rpm_parses_all_fields() -> TestResult {
        let value: Value = serde_yaml::from_str(
            r#"
rationale: Present in the repository.
repository: https://pagure.io/bar.git
cache: https://example.com/cache
ref: 26ca0c0
buildorder: 4
arches: [i686, x86_64]
multilib: [x86_64]
"#,
        )?;
        let component = ComponentRpm::parse("bar".to_string(), &value, "c", true)?;
        assert_eq!(component.buildorder, Some(4));
        assert_eq!(component.git_ref.as_deref(), Some("26ca0c0"));
        assert_eq!(component.arches.len(), 2);
        Ok(())
    }

    #[rstest]
    fn component_rpm_rejects_unknown_key_when_strict() {
        let value: Value = serde_yaml::from_str("ratonale: typo").unwrap();
        assert!(ComponentRpm::parse("bar".to_string(), &value, "c", true).is_err());
        assert!(ComponentRpm::parse("bar".to_string(), &value, "c", false).is_ok());
    }
}
