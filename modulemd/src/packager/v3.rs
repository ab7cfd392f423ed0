//! Version 3 packager documents.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use modulemd_types::Xmd;
use serde_yaml::Value;

use crate::buildopts::Buildopts;
use crate::component::{ComponentModule, ComponentRpm};
use crate::defaults::Defaults;
use crate::dependencies::Dependencies;
use crate::module_stream::v2::{parse_component_maps, parse_rpm_set, ModuleStreamV2};
use crate::module_stream::v3::ModuleStreamV3;
use crate::module_stream::ModuleStream;
use crate::packager::v2::synthesize_defaults;
use crate::profile::Profile;
use crate::yaml::parse;
use crate::Error;

/// One build configuration of a v3 packager document.
///
/// Each configuration describes one build context: the platform to
/// build against, flat build-time and run-time requirements and
/// optional build options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuildConfig {
    /// The build context this configuration produces.
    pub context: Option<String>,
    /// The platform virtual stream to build against.
    pub platform: Option<String>,
    /// Required modules and their single stream at build time.
    pub buildtime_deps: BTreeMap<String, String>,
    /// Required modules and their single stream at run time.
    pub runtime_deps: BTreeMap<String, String>,
    /// Build options for this configuration.
    pub buildopts: Option<Buildopts>,
}

impl BuildConfig {
    fn parse(value: &Value, path: &str, strict: bool) -> Result<BuildConfig, Error> {
        let mut config = BuildConfig::default();
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "context" => config.context = Some(parse::string(raw_value, &key_path)?),
                "platform" => config.platform = Some(parse::string(raw_value, &key_path)?),
                "buildrequires" => {
                    config.buildtime_deps = parse_flat_deps(raw_value, &key_path)?;
                }
                "requires" => {
                    config.runtime_deps = parse_flat_deps(raw_value, &key_path)?;
                }
                "buildopts" => {
                    config.buildopts = Some(Buildopts::parse(raw_value, &key_path, strict)?);
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        if config.context.is_none() {
            return Err(parse::missing(path, "context"));
        }
        if config.platform.is_none() {
            return Err(parse::missing(path, "platform"));
        }
        Ok(config)
    }
}

/// Reads a configuration dependency mapping.
///
/// Values may be a plain stream name or a single-element list; a
/// configuration pins exactly one stream per required module.
fn parse_flat_deps(value: &Value, path: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut deps = BTreeMap::new();
    for (raw_key, raw_value) in parse::mapping(value, path)? {
        let module = parse::key(raw_key, path)?;
        let module_path = parse::child(path, &module);
        let stream = match raw_value {
            Value::Sequence(items) => {
                if items.len() != 1 {
                    return Err(Error::parse(
                        module_path.as_str(),
                        format!(
                            "a build configuration pins exactly one stream per module, \
                             found {}",
                            items.len()
                        ),
                    ));
                }
                parse::string(&items[0], &module_path)?
            }
            scalar => parse::string(scalar, &module_path)?,
        };
        deps.insert(module, stream);
    }
    Ok(deps)
}

/// A version 3 packager document.
///
/// The multi-build-configuration authoring format: common stream
/// metadata plus one [`BuildConfig`] per build context.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackagerV3 {
    /// The module name.
    pub module_name: Option<String>,
    /// The stream name.
    pub stream_name: Option<String>,
    /// A one-line description of the stream.
    pub summary: Option<String>,
    /// A longer description of the stream.
    pub description: Option<String>,
    /// The upstream community website.
    pub community: Option<String>,
    /// The upstream documentation website.
    pub documentation: Option<String>,
    /// The upstream bug tracker.
    pub tracker: Option<String>,
    /// Licenses of the module metadata itself.
    pub module_licenses: BTreeSet<String>,
    /// Opaque extensible metadata.
    pub xmd: Option<Xmd>,
    /// Installation profiles by name, possibly marked as default.
    pub profiles: BTreeMap<String, Profile>,
    /// Binary RPM names forming the stream's public API.
    pub rpm_api: BTreeSet<String>,
    /// Binary RPM names filtered out of the stream.
    pub rpm_filters: BTreeSet<String>,
    /// RPM components by name.
    pub rpm_components: BTreeMap<String, ComponentRpm>,
    /// Module components by name.
    pub module_components: BTreeMap<String, ComponentModule>,
    /// Build configurations by declaration order.
    pub build_configs: Vec<BuildConfig>,
}

impl PackagerV3 {
    /// Parses the `data:` mapping of a v3 `modulemd-packager` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<PackagerV3, Error> {
        let path = "data";
        let mut packager = PackagerV3::default();
        for (raw_key, raw_value) in parse::mapping(data, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "name" => packager.module_name = Some(parse::string(raw_value, &key_path)?),
                "stream" => packager.stream_name = Some(parse::string(raw_value, &key_path)?),
                "summary" => packager.summary = Some(parse::string(raw_value, &key_path)?),
                "description" => {
                    packager.description = Some(parse::string(raw_value, &key_path)?);
                }
                "license" => {
                    packager.module_licenses = parse::string_set(raw_value, &key_path)?;
                }
                "xmd" => {
                    let xmd = parse::xmd(raw_value, &key_path)?;
                    packager.xmd = (!xmd.is_empty()).then_some(xmd);
                }
                "references" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let kind = parse::key(raw_key, &key_path)?;
                        let reference_path = parse::child(&key_path, &kind);
                        match kind.as_str() {
                            "community" => {
                                packager.community =
                                    Some(parse::string(raw_value, &reference_path)?);
                            }
                            "documentation" => {
                                packager.documentation =
                                    Some(parse::string(raw_value, &reference_path)?);
                            }
                            "tracker" => {
                                packager.tracker =
                                    Some(parse::string(raw_value, &reference_path)?);
                            }
                            _ => parse::unknown_key(strict, &key_path, &kind)?,
                        }
                    }
                }
                "profiles" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let name = parse::key(raw_key, &key_path)?;
                        let profile_path = parse::child(&key_path, &name);
                        packager.profiles.insert(
                            name.clone(),
                            Profile::parse(name, raw_value, &profile_path, strict, true)?,
                        );
                    }
                }
                "api" => {
                    packager.rpm_api = parse_rpm_set(raw_value, &key_path, strict)?;
                }
                "filter" => {
                    packager.rpm_filters = parse_rpm_set(raw_value, &key_path, strict)?;
                }
                "components" => {
                    let (rpms, modules) = parse_component_maps(raw_value, &key_path, strict)?;
                    packager.rpm_components = rpms;
                    packager.module_components = modules;
                }
                "configurations" => {
                    for (index, item) in parse::sequence(raw_value, &key_path)?.iter().enumerate()
                    {
                        packager.build_configs.push(BuildConfig::parse(
                            item,
                            &format!("{key_path}[{index}]"),
                            strict,
                        )?);
                    }
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        if packager.module_licenses.is_empty() {
            packager.module_licenses.insert("MIT".to_string());
        }
        Ok(packager)
    }

    fn synthesized_defaults(&self) -> Option<Defaults> {
        synthesize_defaults(
            self.module_name.as_deref(),
            self.stream_name.as_deref(),
            self.profiles.values().filter_map(|profile| {
                profile.is_default.then_some(profile.name.as_str())
            }),
        )
    }

    fn common_v2_stream(&self) -> ModuleStreamV2 {
        let mut profiles = self.profiles.clone();
        for profile in profiles.values_mut() {
            // The default marker lowers into the synthesized defaults
            // document, not into the stream.
            profile.is_default = false;
        }
        ModuleStreamV2 {
            module_name: self.module_name.clone(),
            stream_name: self.stream_name.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            community: self.community.clone(),
            documentation: self.documentation.clone(),
            tracker: self.tracker.clone(),
            module_licenses: self.module_licenses.clone(),
            xmd: self.xmd.clone(),
            profiles,
            rpm_api: self.rpm_api.clone(),
            rpm_filters: self.rpm_filters.clone(),
            rpm_components: self.rpm_components.clone(),
            module_components: self.module_components.clone(),
            ..ModuleStreamV2::default()
        }
    }

    /// Lowers the document to a stream v2 document.
    ///
    /// Each build configuration becomes one dependency slice. Only the
    /// first configuration's build options survive, because a v2
    /// stream carries a single `buildopts` block; discarded
    /// configurations are logged.
    pub(crate) fn to_stream_v2(&self) -> Result<(ModuleStream, Option<Defaults>), Error> {
        let mut stream = self.common_v2_stream();
        for config in &self.build_configs {
            let mut dependencies = Dependencies::default();
            if let Some(platform) = &config.platform {
                dependencies
                    .buildrequires
                    .insert("platform".to_string(), BTreeSet::from([platform.clone()]));
                dependencies
                    .requires
                    .insert("platform".to_string(), BTreeSet::from([platform.clone()]));
            }
            for (module, dep_stream) in &config.buildtime_deps {
                dependencies
                    .buildrequires
                    .insert(module.clone(), BTreeSet::from([dep_stream.clone()]));
            }
            for (module, dep_stream) in &config.runtime_deps {
                dependencies
                    .requires
                    .insert(module.clone(), BTreeSet::from([dep_stream.clone()]));
            }
            stream.dependencies.push(dependencies);
        }
        if let Some(first) = self.build_configs.first() {
            stream.context = first.context.clone();
            stream.buildopts = first.buildopts.clone();
            let discarded: Vec<&str> = self
                .build_configs
                .iter()
                .skip(1)
                .filter(|config| config.buildopts.is_some())
                .filter_map(|config| config.context.as_deref())
                .collect();
            if !discarded.is_empty() {
                warn!(
                    "Lowering to a v2 stream keeps only the first build configuration's \
                     buildopts; dropping buildopts of contexts {discarded:?}"
                );
            }
        }
        Ok((ModuleStream::V2(stream), self.synthesized_defaults()))
    }

    /// Lowers the document to a stream v3 document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document carries more than one build
    /// configuration; a v3 stream expresses exactly one context.
    pub(crate) fn to_stream_v3(&self) -> Result<(ModuleStream, Option<Defaults>), Error> {
        if self.build_configs.len() > 1 {
            return Err(Error::Upgrade(format!(
                "cannot lower a packager document with {} build configurations to a v3 \
                 stream",
                self.build_configs.len()
            )));
        }
        let common = self.common_v2_stream();
        let mut stream = ModuleStreamV3 {
            module_name: common.module_name,
            stream_name: common.stream_name,
            summary: common.summary,
            description: common.description,
            community: common.community,
            documentation: common.documentation,
            tracker: common.tracker,
            module_licenses: common.module_licenses,
            xmd: common.xmd,
            profiles: common.profiles,
            rpm_api: common.rpm_api,
            rpm_filters: common.rpm_filters,
            rpm_components: common.rpm_components,
            module_components: common.module_components,
            ..ModuleStreamV3::default()
        };
        if let Some(config) = self.build_configs.first() {
            stream.context = config.context.clone();
            stream.platform = config.platform.clone();
            stream.buildtime_deps = config.buildtime_deps.clone();
            stream.runtime_deps = config.runtime_deps.clone();
            stream.buildopts = config.buildopts.clone();
        }
        Ok((ModuleStream::V3(stream), self.synthesized_defaults()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    const PACKAGER: &str = r#"
name: foo
stream: latest
summary: An example module
description: An example module.
license: [MIT]
profiles:
  minimal:
    rpms: [foo]
    default: true
configurations:
- context: CTX1
  platform: f33
  buildrequires:
    gofaster: [v1]
  requires:
    gofaster: [v1]
- context: CTX2
  platform: f34
"#;

    #[rstest]
    fn packager_v3_parses_configurations() -> TestResult {
        let data: Value = serde_yaml::from_str(PACKAGER)?;
        let packager = PackagerV3::parse(&data, true)?;
        assert_eq!(packager.build_configs.len(), 2);
        assert_eq!(
            packager.build_configs[0].buildtime_deps["gofaster"],
            "v1"
        );
        Ok(())
    }

    #[rstest]
    fn packager_v3_lowers_to_v2_with_one_slice_per_config() -> TestResult {
        let data: Value = serde_yaml::from_str(PACKAGER)?;
        let packager = PackagerV3::parse(&data, true)?;
        let (stream, defaults) = packager.to_stream_v2()?;
        let ModuleStream::V2(stream) = stream else {
            panic!("expected a v2 stream");
        };
        assert_eq!(stream.dependencies.len(), 2);
        assert_eq!(stream.context.as_deref(), Some("CTX1"));
        assert!(defaults.is_some());
        assert!(stream.profiles.values().all(|profile| !profile.is_default));
        Ok(())
    }

    #[rstest]
    fn packager_v3_refuses_multi_config_v3_lowering() -> TestResult {
        let data: Value = serde_yaml::from_str(PACKAGER)?;
        let packager = PackagerV3::parse(&data, true)?;
        assert!(matches!(packager.to_stream_v3(), Err(Error::Upgrade(_))));
        Ok(())
    }

    #[rstest]
    fn packager_v3_single_config_lowers_to_v3() -> TestResult {
        let data: Value = serde_yaml::from_str(
            r#"
name: foo
stream: latest
summary: s
description: d
license: [MIT]
configurations:
- context: CTX1
  platform: f33
"#,
        )?;
        let packager = PackagerV3::parse(&data, true)?;
        let (stream, _) = packager.to_stream_v3()?;
        let ModuleStream::V3(stream) = stream else {
            panic!("expected a v3 stream");
        };
        assert_eq!(stream.platform.as_deref(), Some("f33"));
        assert_eq!(stream.context.as_deref(), Some("CTX1"));
        Ok(())
    }

    #[rstest]
    fn build_config_rejects_multiple_streams() {
        let value: Value =
            serde_yaml::from_str("context: C\nplatform: f33\nrequires:\n  dep: [a, b]").unwrap();
        assert!(BuildConfig::parse(&value, "c", true).is_err());
    }
}
