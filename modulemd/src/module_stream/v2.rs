//! Version 2 module stream documents.

use std::collections::{BTreeMap, BTreeSet};

use modulemd_types::{Nevra, Xmd};
use serde_yaml::Value;

use crate::buildopts::Buildopts;
use crate::component::{ComponentModule, ComponentRpm};
use crate::dependencies::Dependencies;
use crate::profile::Profile;
use crate::service_level::ServiceLevel;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;
use crate::Error;

/// One stream revision in metadata schema version 2.
///
/// Version 2 is the long-term production schema: dependencies are a
/// list of [`Dependencies`] slices, each expressing acceptable stream
/// sets per required module.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleStreamV2 {
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
    /// Component build options.
    pub buildopts: Option<Buildopts>,
    /// RPM components by name.
    pub rpm_components: BTreeMap<String, ComponentRpm>,
    /// Module components by name.
    pub module_components: BTreeMap<String, ComponentModule>,
    /// Dependency slices.
    pub dependencies: Vec<Dependencies>,
    /// Opaque extensible metadata.
    pub xmd: Option<Xmd>,
}

impl ModuleStreamV2 {
    /// Parses the `data:` mapping of a v2 `modulemd` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<ModuleStreamV2, Error> {
        Self::parse_with(data, strict, false)
    }

    /// Parses the `data:` mapping of a v2 `modulemd` or
    /// `modulemd-packager` document.
    ///
    /// The two schemas differ only in the profile bodies: packager
    /// profiles may carry a `default:` marker.
    pub(crate) fn parse_with(
        data: &Value,
        strict: bool,
        packager: bool,
    ) -> Result<ModuleStreamV2, Error> {
        let path = "data";
        let mut stream = ModuleStreamV2::default();
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
                    for (index, item) in parse::sequence(raw_value, &key_path)?.iter().enumerate()
                    {
                        stream.dependencies.push(Dependencies::parse(
                            item,
                            &format!("{key_path}[{index}]"),
                            strict,
                        )?);
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
                            Profile::parse(name, raw_value, &profile_path, strict, packager)?,
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
                    parse_components(&mut stream, raw_value, &key_path, strict)?;
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
        writer.u64_entry("version", 2);
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
        if !self.dependencies.is_empty() {
            writer.begin_seq("dependencies");
            for dependencies in &self.dependencies {
                dependencies.emit(writer);
            }
        }
        self.emit_references(writer);
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
        emit_components(
            writer,
            &self.rpm_components,
            &self.module_components,
        );
        if !self.rpm_artifacts.is_empty() {
            writer.begin_map("artifacts");
            let rendered: Vec<String> =
                self.rpm_artifacts.iter().map(Nevra::to_string).collect();
            writer.string_seq("rpms", rendered.iter().map(String::as_str));
            writer.end_map();
        }
        writer.end_map();
    }

    fn emit_references(&self, writer: &mut YamlWriter) {
        if self.community.is_none() && self.documentation.is_none() && self.tracker.is_none() {
            return;
        }
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

    /// Validates the stream's own invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if summary, description or module licenses are
    /// missing, or if the component rules (buildorder/buildafter
    /// exclusivity, buildafter target existence, arch subsets) are
    /// violated.
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

    /// Returns true when the stream build-depends on `stream` of
    /// `module` in any dependency slice.
    pub fn build_depends_on_stream(&self, module: &str, stream: &str) -> bool {
        self.dependencies
            .iter()
            .any(|dependencies| stream_set_matches(&dependencies.buildrequires, module, stream))
    }

    /// Returns true when the stream run-depends on `stream` of
    /// `module` in any dependency slice.
    pub fn depends_on_stream(&self, module: &str, stream: &str) -> bool {
        self.dependencies
            .iter()
            .any(|dependencies| stream_set_matches(&dependencies.requires, module, stream))
    }
}

/// Checks one v2 dependency mapping for a module/stream match.
///
/// An empty stream set accepts any stream; a `-stream` entry excludes
/// that stream.
pub(crate) fn stream_set_matches(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    module: &str,
    stream: &str,
) -> bool {
    let Some(streams) = dependencies.get(module) else {
        return false;
    };
    if streams.contains(&format!("-{stream}")) {
        return false;
    }
    streams.is_empty() || streams.contains(stream) || streams.iter().all(|s| s.starts_with('-'))
}

/// Parses an `{api,filter,artifacts}: rpms:` wrapper mapping.
pub(crate) fn parse_rpm_set(
    value: &Value,
    path: &str,
    strict: bool,
) -> Result<BTreeSet<String>, Error> {
    let mut set = BTreeSet::new();
    for (raw_key, raw_value) in parse::mapping(value, path)? {
        let key = parse::key(raw_key, path)?;
        match key.as_str() {
            "rpms" => set = parse::string_set(raw_value, &parse::child(path, &key))?,
            _ => parse::unknown_key(strict, path, &key)?,
        }
    }
    Ok(set)
}

/// Parses a `components:` block into RPM and module component maps.
pub(crate) fn parse_components(
    stream: &mut ModuleStreamV2,
    value: &Value,
    path: &str,
    strict: bool,
) -> Result<(), Error> {
    let (rpms, modules) = parse_component_maps(value, path, strict)?;
    stream.rpm_components = rpms;
    stream.module_components = modules;
    Ok(())
}

/// Parses a `components:` block.
pub(crate) fn parse_component_maps(
    value: &Value,
    path: &str,
    strict: bool,
) -> Result<
    (
        BTreeMap<String, ComponentRpm>,
        BTreeMap<String, ComponentModule>,
    ),
    Error,
> {
    let mut rpms = BTreeMap::new();
    let mut modules = BTreeMap::new();
    for (raw_key, raw_value) in parse::mapping(value, path)? {
        let kind = parse::key(raw_key, path)?;
        let kind_path = parse::child(path, &kind);
        match kind.as_str() {
            "rpms" => {
                for (raw_key, raw_value) in parse::mapping(raw_value, &kind_path)? {
                    let name = parse::key(raw_key, &kind_path)?;
                    let component_path = parse::child(&kind_path, &name);
                    rpms.insert(
                        name.clone(),
                        ComponentRpm::parse(name, raw_value, &component_path, strict)?,
                    );
                }
            }
            "modules" => {
                for (raw_key, raw_value) in parse::mapping(raw_value, &kind_path)? {
                    let name = parse::key(raw_key, &kind_path)?;
                    let component_path = parse::child(&kind_path, &name);
                    modules.insert(
                        name.clone(),
                        ComponentModule::parse(name, raw_value, &component_path, strict)?,
                    );
                }
            }
            _ => parse::unknown_key(strict, path, &kind)?,
        }
    }
    Ok((rpms, modules))
}

/// Emits a `components:` block.
pub(crate) fn emit_components(
    writer: &mut YamlWriter,
    rpms: &BTreeMap<String, ComponentRpm>,
    modules: &BTreeMap<String, ComponentModule>,
) {
    if rpms.is_empty() && modules.is_empty() {
        return;
    }
    writer.begin_map("components");
    if !rpms.is_empty() {
        writer.begin_map("rpms");
        for component in rpms.values() {
            component.emit(writer);
        }
        writer.end_map();
    }
    if !modules.is_empty() {
        writer.begin_map("modules");
        for component in modules.values() {
            component.emit(writer);
        }
        writer.end_map();
    }
    writer.end_map();
}

/// Runs the whole-stream component checks shared by all schema
/// versions.
pub(crate) fn validate_components(
    rpms: &BTreeMap<String, ComponentRpm>,
    modules: &BTreeMap<String, ComponentModule>,
    buildopts: Option<&Buildopts>,
) -> Result<(), Error> {
    let mut uses_buildorder = false;
    let mut uses_buildafter = false;
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(rpms.keys().map(String::as_str));
    names.extend(modules.keys().map(String::as_str));

    let ordering = rpms
        .values()
        .map(|c| (&c.name, c.buildorder, &c.buildafter))
        .chain(
            modules
                .values()
                .map(|c| (&c.name, c.buildorder, &c.buildafter)),
        );
    for (name, buildorder, buildafter) in ordering {
        uses_buildorder |= buildorder.is_some();
        uses_buildafter |= !buildafter.is_empty();
        for target in buildafter {
            if !names.contains(target.as_str()) {
                return Err(Error::Validate(format!(
                    "component {name:?} lists unknown buildafter target {target:?}"
                )));
            }
        }
    }
    if uses_buildorder && uses_buildafter {
        return Err(Error::Validate(
            "a stream may use buildorder or buildafter, never both".to_string(),
        ));
    }

    if let Some(buildopts) = buildopts {
        if !buildopts.arches.is_empty() {
            for component in rpms.values() {
                if let Some(stray) = component
                    .arches
                    .iter()
                    .find(|arch| !buildopts.arches.contains(*arch))
                {
                    return Err(Error::Validate(format!(
                        "component {:?} is restricted to architecture {stray:?}, which the \
                         stream's buildopts do not include",
                        component.name
                    )));
                }
            }
        }
    }
    Ok(())
}
