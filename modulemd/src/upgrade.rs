//! Version upgrades for module stream documents.
//!
//! Upgrades are chained single-step transformers: to go from v1 to v3
//! the stream passes through v2. Downgrades are always rejected, and a
//! failing step leaves the caller's stream untouched because every
//! step operates on a copy.

use std::collections::BTreeSet;

use modulemd_types::MdVersion;

use crate::dependencies::Dependencies;
use crate::module_stream::v1::ModuleStreamV1;
use crate::module_stream::v2::ModuleStreamV2;
use crate::module_stream::v3::ModuleStreamV3;
use crate::module_stream::ModuleStream;
use crate::service_level::ServiceLevel;
use crate::Error;

impl ModuleStream {
    /// Upgrades the stream to the `target` schema version.
    ///
    /// Applies the lowest applicable single-step transformer until the
    /// target version is reached. The stream itself is not modified;
    /// the upgraded stream is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is below the current version, or
    /// if a step cannot represent the stream's content in the next
    /// schema (a v2 stream with several dependency slices has no v3
    /// form).
    pub fn upgrade(&self, target: MdVersion) -> Result<ModuleStream, Error> {
        let current = self.mdversion();
        if target < current {
            return Err(Error::Upgrade(format!(
                "cannot downgrade a stream from version {current} to {target}"
            )));
        }
        let mut stream = self.clone();
        while stream.mdversion() < target {
            stream = match stream {
                ModuleStream::V1(v1) => ModuleStream::V2(upgrade_v1_to_v2(&v1)),
                ModuleStream::V2(v2) => ModuleStream::V3(upgrade_v2_to_v3(&v2)?),
                ModuleStream::V3(v3) => ModuleStream::V3(v3),
            };
        }
        Ok(stream)
    }
}

/// Upgrades a v1 stream to v2.
///
/// A bare `eol:` date becomes a `rawhide` service level, and the flat
/// build/runtime mappings become a single dependency slice with
/// one-element stream sets.
fn upgrade_v1_to_v2(v1: &ModuleStreamV1) -> ModuleStreamV2 {
    let mut stream = ModuleStreamV2 {
        module_name: v1.module_name.clone(),
        stream_name: v1.stream_name.clone(),
        version: v1.version,
        context: v1.context.clone(),
        arch: v1.arch.clone(),
        summary: v1.summary.clone(),
        description: v1.description.clone(),
        community: v1.community.clone(),
        documentation: v1.documentation.clone(),
        tracker: v1.tracker.clone(),
        module_licenses: v1.module_licenses.clone(),
        content_licenses: v1.content_licenses.clone(),
        rpm_api: v1.rpm_api.clone(),
        rpm_artifacts: v1.rpm_artifacts.clone(),
        rpm_filters: v1.rpm_filters.clone(),
        profiles: v1.profiles.clone(),
        servicelevels: v1.servicelevels.clone(),
        buildopts: v1.buildopts.clone(),
        rpm_components: v1.rpm_components.clone(),
        module_components: v1.module_components.clone(),
        xmd: v1.xmd.clone(),
        ..ModuleStreamV2::default()
    };

    if let Some(eol) = v1.eol {
        stream
            .servicelevels
            .entry("rawhide".to_string())
            .or_insert_with(|| ServiceLevel {
                name: "rawhide".to_string(),
                eol: Some(eol),
            });
    }

    if !v1.buildrequires.is_empty() || !v1.requires.is_empty() {
        let mut dependencies = Dependencies::default();
        for (module, dep_stream) in &v1.buildrequires {
            dependencies
                .buildrequires
                .insert(module.clone(), BTreeSet::from([dep_stream.clone()]));
        }
        for (module, dep_stream) in &v1.requires {
            dependencies
                .requires
                .insert(module.clone(), BTreeSet::from([dep_stream.clone()]));
        }
        stream.dependencies.push(dependencies);
    }

    stream
}

/// Upgrades a v2 stream to v3.
///
/// # Errors
///
/// Returns an error if the stream carries several dependency slices,
/// or if any slice entry accepts more or fewer than exactly one
/// stream; v3 cannot express disjunctive dependencies.
fn upgrade_v2_to_v3(v2: &ModuleStreamV2) -> Result<ModuleStreamV3, Error> {
    if v2.dependencies.len() > 1 {
        return Err(Error::Upgrade(format!(
            "cannot upgrade a stream with {} dependency slices to version 3",
            v2.dependencies.len()
        )));
    }

    let mut stream = ModuleStreamV3 {
        module_name: v2.module_name.clone(),
        stream_name: v2.stream_name.clone(),
        version: v2.version,
        context: v2.context.clone(),
        arch: v2.arch.clone(),
        summary: v2.summary.clone(),
        description: v2.description.clone(),
        community: v2.community.clone(),
        documentation: v2.documentation.clone(),
        tracker: v2.tracker.clone(),
        module_licenses: v2.module_licenses.clone(),
        content_licenses: v2.content_licenses.clone(),
        rpm_api: v2.rpm_api.clone(),
        rpm_artifacts: v2.rpm_artifacts.clone(),
        rpm_filters: v2.rpm_filters.clone(),
        profiles: v2.profiles.clone(),
        servicelevels: v2.servicelevels.clone(),
        buildopts: v2.buildopts.clone(),
        rpm_components: v2.rpm_components.clone(),
        module_components: v2.module_components.clone(),
        xmd: v2.xmd.clone(),
        ..ModuleStreamV3::default()
    };

    let Some(dependencies) = v2.dependencies.first() else {
        return Ok(stream);
    };

    for (module, streams) in &dependencies.buildrequires {
        let dep_stream = single_stream(module, streams)?;
        if module == "platform" {
            stream.platform = Some(dep_stream);
        } else {
            stream.buildtime_deps.insert(module.clone(), dep_stream);
        }
    }
    for (module, streams) in &dependencies.requires {
        let dep_stream = single_stream(module, streams)?;
        if module == "platform" {
            if stream.platform.is_none() {
                stream.platform = Some(dep_stream);
            }
        } else {
            stream.runtime_deps.insert(module.clone(), dep_stream);
        }
    }

    Ok(stream)
}

fn single_stream(module: &str, streams: &BTreeSet<String>) -> Result<String, Error> {
    let mut iter = streams.iter();
    match (iter.next(), iter.next()) {
        (Some(stream), None) => Ok(stream.clone()),
        _ => Err(Error::Upgrade(format!(
            "dependency on module {module:?} must name exactly one stream to be \
             expressible in version 3, found {}",
            streams.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use modulemd_types::EolDate;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    fn v1_stream() -> ModuleStream {
        ModuleStream::V1(ModuleStreamV1 {
            module_name: Some("foo".to_string()),
            stream_name: Some("latest".to_string()),
            version: 1,
            summary: Some("s".to_string()),
            description: Some("d".to_string()),
            module_licenses: BTreeSet::from(["MIT".to_string()]),
            eol: Some(EolDate::from_str("2020-12-31").unwrap()),
            buildrequires: BTreeMap::from([("platform".to_string(), "f33".to_string())]),
            requires: BTreeMap::from([("platform".to_string(), "f33".to_string())]),
            ..ModuleStreamV1::default()
        })
    }

    #[rstest]
    fn upgrade_v1_to_v2_converts_eol_and_dependencies() -> TestResult {
        let upgraded = v1_stream().upgrade(MdVersion::Two)?;
        let ModuleStream::V2(v2) = upgraded else {
            panic!("expected a v2 stream");
        };
        assert_eq!(
            v2.servicelevels["rawhide"].eol,
            Some(EolDate::from_str("2020-12-31")?)
        );
        assert_eq!(v2.dependencies.len(), 1);
        assert_eq!(
            v2.dependencies[0].buildrequires["platform"],
            BTreeSet::from(["f33".to_string()])
        );
        Ok(())
    }

    #[rstest]
    fn upgrade_chains_to_v3() -> TestResult {
        let upgraded = v1_stream().upgrade(MdVersion::Three)?;
        let ModuleStream::V3(v3) = upgraded else {
            panic!("expected a v3 stream");
        };
        assert_eq!(v3.platform.as_deref(), Some("f33"));
        assert!(v3.buildtime_deps.is_empty());
        Ok(())
    }

    #[rstest]
    fn upgrade_rejects_downgrade() {
        let stream = ModuleStream::V2(ModuleStreamV2::default());
        assert!(matches!(
            stream.upgrade(MdVersion::One),
            Err(Error::Upgrade(_))
        ));
    }

    #[rstest]
    fn upgrade_is_idempotent_at_target() -> TestResult {
        let once = v1_stream().upgrade(MdVersion::Three)?;
        let twice = once.upgrade(MdVersion::Three)?;
        assert_eq!(once, twice);
        Ok(())
    }

    #[rstest]
    fn upgrade_rejects_disjunctive_dependencies() {
        let stream = ModuleStream::V2(ModuleStreamV2 {
            dependencies: vec![Dependencies::default(), Dependencies::default()],
            ..ModuleStreamV2::default()
        });
        let result = stream.upgrade(MdVersion::Three);
        assert!(matches!(result, Err(Error::Upgrade(_))));
        // The original stream stays untouched.
        let ModuleStream::V2(v2) = stream else {
            panic!("expected a v2 stream");
        };
        assert_eq!(v2.dependencies.len(), 2);
    }
}
