//! Version 1 module stream documents.

use std::collections::{BTreeMap, BTreeSet};

use modulemd_types::{EolDate, Nevra, Xmd};
use serde_yaml::Value;

use crate::buildopts::Buildopts;
use crate::component::{ComponentModule, ComponentRpm};
use crate::module_stream::v2::{
    emit_components, parse_component_maps, parse_rpm_set, validate_components,
};
use crate::profile::Profile;
use crate::service_level::ServiceLevel;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;
use crate::Error;

/// One stream revision in the legacy metadata schema version 1.
///
/// Version 1 expresses dependencies as flat module-to-stream mappings
/// and may carry a bare `eol:` date instead of service levels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleStreamV1 {
    /// The module name.
    pub module_name: Option<String>,
    /// The stream name.
    pub stream_name: Option<String>,
    /// The stream version, typically a `YYYYMMDDhhmmss` timestamp.
    pub version: u64,
    /// The build context distinguishing parallel builds.
    pub context: Option<String>,
    /// The hardware architecture the artifacts were built for.
    pub arch: Option<String>,
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
    /// Licenses of the packaged content.
    pub content_licenses: BTreeSet<String>,
    /// Binary RPM names forming the stream's public API.
    pub rpm_api: BTreeSet<String>,
    /// Artifacts shipped with this stream.
    pub rpm_artifacts: BTreeSet<Nevra>,
    /// Binary RPM names filtered out of the stream.
    pub rpm_filters: BTreeSet<String>,
    /// Installation profiles by name.
    pub profiles: BTreeMap<String, Profile>,
    /// Service level windows by name.
    pub servicelevels: BTreeMap<String, ServiceLevel>,
    /// A bare end-of-life date, the v1 precursor of service levels.
    pub eol: Option<EolDate>,
    /// Component build options.
    pub buildopts: Option<Buildopts>,
    /// RPM components by name.
    pub rpm_components: BTreeMap<String, ComponentRpm>,
    /// Module components by name.
    pub module_components: BTreeMap<String, ComponentModule>,
    /// Required modules and their single stream at build time.
    pub buildrequires: BTreeMap<String, String>,
    /// Required modules and their single stream at run time.
    pub requires: BTreeMap<String, String>,
    /// Opaque extensible metadata.
    pub xmd: Option<Xmd>,
}

impl ModuleStreamV1 {
    /// Parses the `data:` mapping of a v1 `modulemd` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<ModuleStreamV1, Error> {
        let path = "data";
        let mut stream = ModuleStreamV1::default();
        for (raw_key, raw_value) in parse::mapping(data, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "name" => stream.module_name = Some(parse::string(raw_value, &key_path)?),
                "stream" => stream.stream_name = Some(parse::string(raw_value, &key_path)?),
                "version" => stream.version = parse::u64(raw_value, &key_path)?,
                "context" => stream.context = Some(parse::string(raw_value, &key_path)?),
                "arch" => stream.arch = Some(parse::string(raw_value, &key_path)?),
                "summary" => stream.summary = Some(parse::string(raw_value, &key_path)?),
                "description" => stream.description = Some(parse::string(raw_value, &key_path)?),
                "eol" => stream.eol = Some(parse::date(raw_value, &key_path)?),
                "servicelevels" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let name = parse::key(raw_key, &key_path)?;
                        let sl_path = parse::child(&key_path, &name);
                        stream.servicelevels.insert(
                            name.clone(),
                            ServiceLevel::parse(name, raw_value, &sl_path, strict)?,
                        );
                    }
                }
                "license" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let kind = parse::key(raw_key, &key_path)?;
                        let license_path = parse::child(&key_path, &kind);
                        match kind.as_str() {
                            "module" => {
                                stream.module_licenses =
                                    parse::string_set(raw_value, &license_path)?;
                            }
                            "content" => {
                                stream.content_licenses =
                                    parse::string_set(raw_value, &license_path)?;
                            }
                            _ => parse::unknown_key(strict, &key_path, &kind)?,
                        }
                    }
                }
                "xmd" => {
                    let xmd = parse::xmd(raw_value, &key_path)?;
                    stream.xmd = (!xmd.is_empty()).then_some(xmd);
                }
                "dependencies" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let kind = parse::key(raw_key, &key_path)?;
                        let deps_path = parse::child(&key_path, &kind);
                        match kind.as_str() {
                            "buildrequires" => {
                                stream.buildrequires =
                                    parse::string_string_map(raw_value, &deps_path)?;
                            }
                            "requires" => {
                                stream.requires =
                                    parse::string_string_map(raw_value, &deps_path)?;
                            }
                            _ => parse::unknown_key(strict, &key_path, &kind)?,
                        }
                    }
                }
                "references" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let kind = parse::key(raw_key, &key_path)?;
                        let reference_path = parse::child(&key_path, &kind);
                        match kind.as_str() {
                            "community" => {
                                stream.community =
                                    Some(parse::string(raw_value, &reference_path)?);
                            }
                            "documentation" => {
                                stream.documentation =
                                    Some(parse::string(raw_value, &reference_path)?);
                            }
                            "tracker" => {
                                stream.tracker = Some(parse::string(raw_value, &reference_path)?);
                            }
                            _ => parse::unknown_key(strict, &key_path, &kind)?,
                        }
                    }
                }
                "profiles" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let name = parse::key(raw_key, &key_path)?;
                        let profile_path = parse::child(&key_path, &name);
                        stream.profiles.insert(
                            name.clone(),
                            Profile::parse(name, raw_value, &profile_path, strict, false)?,
                        );
                    }
                }
                "api" => {
                    stream.rpm_api = parse_rpm_set(raw_value, &key_path, strict)?;
                }
                "filter" => {
                    stream.rpm_filters = parse_rpm_set(raw_value, &key_path, strict)?;
                }
                "artifacts" => {
                    let rpms = parse_rpm_set(raw_value, &key_path, strict)?;
                    for rpm in rpms {
                        let nevra = rpm.parse::<Nevra>().map_err(|error| {
                            Error::parse(parse::child(&key_path, "rpms"), error.to_string())
                        })?;
                        stream.rpm_artifacts.insert(nevra);
                    }
                }
                "buildopts" => {
                    stream.buildopts = Some(Buildopts::parse(raw_value, &key_path, strict)?);
                }
                "components" => {
                    let (rpms, modules) = parse_component_maps(raw_value, &key_path, strict)?;
                    stream.rpm_components = rpms;
                    stream.module_components = modules;
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(stream)
    }

    /// Emits the document, including its `document:`/`version:` header.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.doc_start();
        writer.entry("document", "modulemd");
        writer.u64_entry("version", 1);
        writer.begin_map("data");
        if let Some(name) = &self.module_name {
            writer.entry("name", name);
        }
        if let Some(stream) = &self.stream_name {
            writer.quoted_entry("stream", stream);
        }
        if self.version != 0 {
            writer.u64_entry("version", self.version);
        }
        if let Some(context) = &self.context {
            writer.entry("context", context);
        }
        if let Some(arch) = &self.arch {
            writer.entry("arch", arch);
        }
        if let Some(summary) = &self.summary {
            writer.entry("summary", summary);
        }
        if let Some(description) = &self.description {
            writer.entry("description", description);
        }
        if let Some(eol) = &self.eol {
            writer.entry("eol", &eol.to_string());
        }
        if !self.servicelevels.is_empty() {
            writer.begin_map("servicelevels");
            for service_level in self.servicelevels.values() {
                service_level.emit(writer);
            }
            writer.end_map();
        }
        if !self.module_licenses.is_empty() || !self.content_licenses.is_empty() {
            writer.begin_map("license");
            if !self.module_licenses.is_empty() {
                writer.string_seq("module", self.module_licenses.iter().map(String::as_str));
            }
            if !self.content_licenses.is_empty() {
                writer.string_seq("content", self.content_licenses.iter().map(String::as_str));
            }
            writer.end_map();
        }
        if let Some(xmd) = &self.xmd {
            if !xmd.is_empty() {
                crate::yaml::emit::emit_xmd(writer, "xmd", xmd);
            }
        }
        if !self.buildrequires.is_empty() || !self.requires.is_empty() {
            writer.begin_map("dependencies");
            if !self.buildrequires.is_empty() {
                writer.begin_map("buildrequires");
                for (module, stream) in &self.buildrequires {
                    writer.entry(module, stream);
                }
                writer.end_map();
            }
            if !self.requires.is_empty() {
                writer.begin_map("requires");
                for (module, stream) in &self.requires {
                    writer.entry(module, stream);
                }
                writer.end_map();
            }
            writer.end_map();
        }
        if self.community.is_some() || self.documentation.is_some() || self.tracker.is_some() {
            writer.begin_map("references");
            if let Some(community) = &self.community {
                writer.entry("community", community);
            }
            if let Some(documentation) = &self.documentation {
                writer.entry("documentation", documentation);
            }
            if let Some(tracker) = &self.tracker {
                writer.entry("tracker", tracker);
            }
            writer.end_map();
        }
        if !self.profiles.is_empty() {
            writer.begin_map("profiles");
            for profile in self.profiles.values() {
                profile.emit(writer);
            }
            writer.end_map();
        }
        if !self.rpm_api.is_empty() {
            writer.begin_map("api");
            writer.string_seq("rpms", self.rpm_api.iter().map(String::as_str));
            writer.end_map();
        }
        if !self.rpm_filters.is_empty() {
            writer.begin_map("filter");
            writer.string_seq("rpms", self.rpm_filters.iter().map(String::as_str));
            writer.end_map();
        }
        if let Some(buildopts) = &self.buildopts {
            if !buildopts.is_empty() {
                buildopts.emit(writer);
            }
        }
        emit_components(writer, &self.rpm_components, &self.module_components);
        if !self.rpm_artifacts.is_empty() {
            writer.begin_map("artifacts");
            let rendered: Vec<String> =
                self.rpm_artifacts.iter().map(Nevra::to_string).collect();
            writer.string_seq("rpms", rendered.iter().map(String::as_str));
            writer.end_map();
        }
        writer.end_map();
    }

    /// Validates the stream's own invariants.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`ModuleStreamV2::validate`](crate::ModuleStreamV2::validate).
    pub fn validate(&self) -> Result<(), Error> {
        if self.summary.is_none() {
            return Err(Error::Validate("stream has no summary".to_string()));
        }
        if self.description.is_none() {
            return Err(Error::Validate("stream has no description".to_string()));
        }
        if self.module_licenses.is_empty() {
            return Err(Error::Validate(
                "stream has no module metadata license".to_string(),
            ));
        }
        validate_components(
            &self.rpm_components,
            &self.module_components,
            self.buildopts.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    fn v1_parses_flat_dependencies_and_eol() -> TestResult {
        let data: Value = serde_yaml::from_str(
            r#"
name: foo
stream: latest
version: 1
summary: s
description: d
eol: 2020-12-31
license:
  module: [MIT]
dependencies:
  buildrequires:
    platform: f33
  requires:
    platform: f33
"#,
        )?;
        let stream = ModuleStreamV1::parse(&data, true)?;
        assert_eq!(stream.eol, Some(EolDate::from_str("2020-12-31")?));
        assert_eq!(stream.buildrequires["platform"], "f33");
        stream.validate()?;
        Ok(())
    }
}
