//! Priority-based merging of module indexes.
//!
//! A merger combines the metadata of several repositories into one
//! index. Streams and defaults follow priority rules, translations and
//! obsoletes follow last-modified precedence regardless of priority.

use std::collections::BTreeMap;

use crate::defaults::{Defaults, DefaultsV1, Intent};
use crate::module_index::ModuleIndex;
use crate::module_stream::ModuleStream;
use crate::obsoletes::Obsoletes;
use crate::translation::Translation;
use crate::Error;

/// Merges several module indexes under a caller-supplied priority
/// ordering.
///
/// Inputs are consumed read-only; [`Merger::resolve`] produces a fresh
/// index. Within equal priorities the later-added index is considered
/// the later-listed one for override resolution.
#[derive(Clone, Debug, Default)]
pub struct Merger {
    inputs: Vec<(ModuleIndex, i32)>,
}

impl Merger {
    /// Creates a merger without inputs.
    pub fn new() -> Merger {
        Merger::default()
    }

    /// Adds an index with the given priority.
    ///
    /// Higher priorities win conflicts against lower ones.
    pub fn add_index(&mut self, index: &ModuleIndex, priority: i32) {
        self.inputs.push((index.clone(), priority));
    }

    /// Merges all added indexes into a new one.
    ///
    /// * Streams with equal NSVCA and equal content merge trivially;
    ///   unequal content resolves by priority. At equal priority the
    ///   merge fails unless `override_conflicts` is set, in which case
    ///   the later-listed index wins.
    /// * Defaults merge field by field with the same priority rules; a
    ///   same-priority default-stream disagreement resolves to *no*
    ///   default stream when `strict_default_streams` is unset.
    /// * Translations and obsoletes are taken from whichever input has
    ///   the largest `modified` stamp; priority is not consulted. An
    ///   obsoletes winner carrying `reset` erases the stream's
    ///   history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MergeConflict`] naming the module and field
    /// when inputs disagree irreconcilably.
    pub fn resolve(
        &self,
        override_conflicts: bool,
        strict_default_streams: bool,
    ) -> Result<ModuleIndex, Error> {
        let mut streams: BTreeMap<(String, String), (i32, ModuleStream)> = BTreeMap::new();
        let mut defaults: BTreeMap<String, (i32, DefaultsV1)> = BTreeMap::new();
        let mut translations: BTreeMap<(String, String), Translation> = BTreeMap::new();
        let mut obsoletes: BTreeMap<(String, String, Option<String>), Obsoletes> = BTreeMap::new();

        // Process inputs in ascending priority; the sort is stable, so
        // equal priorities keep their listing order for override
        // resolution.
        let mut inputs: Vec<&(ModuleIndex, i32)> = self.inputs.iter().collect();
        inputs.sort_by_key(|input| input.1);

        for (index, priority) in inputs {
            for module in index.modules() {
                let module_name = module.name().to_string();

                for stream in module.streams() {
                    merge_stream(
                        &mut streams,
                        &module_name,
                        stream,
                        *priority,
                        override_conflicts,
                    )?;
                }

                if let Some(Defaults::V1(incoming)) = module.defaults() {
                    match defaults.remove(&module_name) {
                        None => {
                            defaults.insert(module_name.clone(), (*priority, incoming.clone()));
                        }
                        Some((existing_priority, existing)) => {
                            let merged = merge_defaults(
                                &module_name,
                                &existing,
                                existing_priority,
                                incoming,
                                *priority,
                                override_conflicts,
                                strict_default_streams,
                            )?;
                            defaults.insert(
                                module_name.clone(),
                                (existing_priority.max(*priority), merged),
                            );
                        }
                    }
                }

                for translation in module.translations().values() {
                    let key = (
                        module_name.clone(),
                        translation.stream_name.clone().unwrap_or_default(),
                    );
                    match translations.get(&key) {
                        Some(existing) if existing.modified >= translation.modified => {}
                        _ => {
                            translations.insert(key, translation.clone());
                        }
                    }
                }

                for record in module.obsoletes() {
                    let key = (
                        module_name.clone(),
                        record.stream_name.clone().unwrap_or_default(),
                        record.context.clone(),
                    );
                    match obsoletes.get(&key) {
                        Some(existing) if existing.modified >= record.modified => {}
                        _ => {
                            obsoletes.insert(key, record.clone());
                        }
                    }
                }
            }
        }

        let mut merged = ModuleIndex::new();
        for (_, (_, stream)) in streams {
            merged.add_module_stream(stream)?;
        }
        for (_, (_, module_defaults)) in defaults {
            merged.add_defaults(Defaults::V1(module_defaults))?;
        }
        for (_, translation) in translations {
            merged.add_translation(translation)?;
        }
        for (_, record) in obsoletes {
            // A winning reset record erases the stream's deprecation
            // history instead of being carried along.
            if !record.reset {
                merged.add_obsoletes(record)?;
            }
        }
        Ok(merged)
    }
}

fn merge_stream(
    streams: &mut BTreeMap<(String, String), (i32, ModuleStream)>,
    module_name: &str,
    stream: &ModuleStream,
    priority: i32,
    override_conflicts: bool,
) -> Result<(), Error> {
    let key = (module_name.to_string(), stream.nsvca().to_string());
    match streams.get_mut(&key) {
        None => {
            streams.insert(key, (priority, stream.clone()));
        }
        Some((existing_priority, existing)) => {
            if existing == stream {
                *existing_priority = (*existing_priority).max(priority);
            } else if priority > *existing_priority {
                *existing_priority = priority;
                *existing = stream.clone();
            } else if priority == *existing_priority {
                if !override_conflicts {
                    return Err(Error::MergeConflict {
                        module: module_name.to_string(),
                        reason: format!(
                            "stream {} differs between inputs of equal priority",
                            stream.nsvca()
                        ),
                    });
                }
                *existing = stream.clone();
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn merge_defaults(
    module_name: &str,
    existing: &DefaultsV1,
    existing_priority: i32,
    incoming: &DefaultsV1,
    incoming_priority: i32,
    override_conflicts: bool,
    strict_default_streams: bool,
) -> Result<DefaultsV1, Error> {
    // A higher-priority side wins every conflicting field but still
    // merges with what the lower side adds.
    let mut merged = DefaultsV1::new(module_name);

    merged.default_stream = merge_default_stream(
        module_name,
        "stream",
        existing.default_stream.as_deref(),
        existing_priority,
        incoming.default_stream.as_deref(),
        incoming_priority,
        override_conflicts,
        strict_default_streams,
    )?;

    merged.profile_defaults = merge_profile_defaults(
        module_name,
        "profiles",
        &existing.profile_defaults,
        existing_priority,
        &incoming.profile_defaults,
        incoming_priority,
        override_conflicts,
    )?;

    let mut intent_names: Vec<&String> = existing.intents.keys().collect();
    intent_names.extend(incoming.intents.keys());
    intent_names.sort_unstable();
    intent_names.dedup();
    for name in intent_names {
        let merged_intent = match (existing.intents.get(name), incoming.intents.get(name)) {
            (Some(intent), None) => intent.clone(),
            (None, Some(intent)) => intent.clone(),
            (Some(a), Some(b)) => Intent {
                default_stream: merge_default_stream(
                    module_name,
                    &format!("intents.{name}.stream"),
                    a.default_stream.as_deref(),
                    existing_priority,
                    b.default_stream.as_deref(),
                    incoming_priority,
                    override_conflicts,
                    strict_default_streams,
                )?,
                profile_defaults: merge_profile_defaults(
                    module_name,
                    &format!("intents.{name}.profiles"),
                    &a.profile_defaults,
                    existing_priority,
                    &b.profile_defaults,
                    incoming_priority,
                    override_conflicts,
                )?,
            },
            (None, None) => unreachable!("name came from one of the maps"),
        };
        merged.intents.insert(name.clone(), merged_intent);
    }

    Ok(merged)
}

#[allow(clippy::too_many_arguments)]
fn merge_default_stream(
    module_name: &str,
    field: &str,
    existing: Option<&str>,
    existing_priority: i32,
    incoming: Option<&str>,
    incoming_priority: i32,
    override_conflicts: bool,
    strict_default_streams: bool,
) -> Result<Option<String>, Error> {
    match (existing, incoming) {
        (Some(a), Some(b)) if a != b => {
            if incoming_priority > existing_priority {
                Ok(Some(b.to_string()))
            } else if incoming_priority < existing_priority {
                Ok(Some(a.to_string()))
            } else if override_conflicts {
                Ok(Some(b.to_string()))
            } else if !strict_default_streams {
                // The documented relaxation: an unresolvable
                // disagreement means the merged module simply has no
                // default stream.
                Ok(None)
            } else {
                Err(Error::MergeConflict {
                    module: module_name.to_string(),
                    reason: format!("{field} is {a:?} in one input and {b:?} in another"),
                })
            }
        }
        (Some(a), _) => Ok(Some(a.to_string())),
        (_, Some(b)) => Ok(Some(b.to_string())),
        (None, None) => Ok(None),
    }
}

fn merge_profile_defaults(
    module_name: &str,
    field: &str,
    existing: &BTreeMap<String, std::collections::BTreeSet<String>>,
    existing_priority: i32,
    incoming: &BTreeMap<String, std::collections::BTreeSet<String>>,
    incoming_priority: i32,
    override_conflicts: bool,
) -> Result<BTreeMap<String, std::collections::BTreeSet<String>>, Error> {
    let mut merged = existing.clone();
    for (stream, profiles) in incoming {
        match merged.get(stream) {
            None => {
                merged.insert(stream.clone(), profiles.clone());
            }
            Some(current) if current == profiles => {}
            Some(_) => {
                if incoming_priority > existing_priority {
                    merged.insert(stream.clone(), profiles.clone());
                } else if incoming_priority == existing_priority {
                    if !override_conflicts {
                        return Err(Error::MergeConflict {
                            module: module_name.to_string(),
                            reason: format!(
                                "{field} disagrees on the profile set of stream {stream:?}"
                            ),
                        });
                    }
                    merged.insert(stream.clone(), profiles.clone());
                }
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    fn index_with_defaults(module: &str, stream: &str) -> ModuleIndex {
        let mut index = ModuleIndex::new();
        let mut defaults = DefaultsV1::new(module);
        defaults.default_stream = Some(stream.to_string());
        index.add_defaults(Defaults::V1(defaults)).unwrap();
        index
    }

    #[rstest]
    fn equal_priority_default_stream_conflict_errors_when_strict() {
        let mut merger = Merger::new();
        merger.add_index(&index_with_defaults("foo", "a"), 0);
        merger.add_index(&index_with_defaults("foo", "b"), 0);

        assert!(matches!(
            merger.resolve(false, true),
            Err(Error::MergeConflict { .. })
        ));
    }

    #[rstest]
    fn equal_priority_default_stream_conflict_relaxes_to_none() -> TestResult {
        let mut merger = Merger::new();
        merger.add_index(&index_with_defaults("foo", "a"), 0);
        merger.add_index(&index_with_defaults("foo", "b"), 0);

        let merged = merger.resolve(false, false)?;
        let defaults = merged.get_module("foo").unwrap().defaults().unwrap();
        assert_eq!(defaults.default_stream(None), None);
        Ok(())
    }

    #[rstest]
    fn higher_priority_default_stream_wins() -> TestResult {
        let mut merger = Merger::new();
        merger.add_index(&index_with_defaults("foo", "a"), 0);
        merger.add_index(&index_with_defaults("foo", "b"), 10);

        let merged = merger.resolve(false, true)?;
        let defaults = merged.get_module("foo").unwrap().defaults().unwrap();
        assert_eq!(defaults.default_stream(None), Some("b"));
        Ok(())
    }

    #[rstest]
    fn translations_merge_by_modified_not_priority() -> TestResult {
        let mut newer = ModuleIndex::new();
        let mut translation = Translation::new("foo", "latest");
        translation.modified = 20;
        newer.add_translation(translation)?;

        let mut older = ModuleIndex::new();
        let mut translation = Translation::new("foo", "latest");
        translation.modified = 10;
        older.add_translation(translation)?;

        let mut merger = Merger::new();
        merger.add_index(&newer, 0);
        merger.add_index(&older, 100);

        let merged = merger.resolve(false, true)?;
        let module = merged.get_module("foo").unwrap();
        assert_eq!(module.translation("latest").unwrap().modified, 20);
        Ok(())
    }

    #[rstest]
    fn obsoletes_reset_erases_history() -> TestResult {
        let mut first = index_with_defaults("foo", "latest");
        let mut record = Obsoletes::new(1, "foo", "latest");
        record.message = Some("gone".to_string());
        first.add_obsoletes(record)?;

        let mut second = ModuleIndex::new();
        let mut record = Obsoletes::new(2, "foo", "latest");
        record.reset = true;
        second.add_obsoletes(record)?;

        let mut merger = Merger::new();
        merger.add_index(&first, 0);
        merger.add_index(&second, 0);

        let merged = merger.resolve(false, true)?;
        let module = merged.get_module("foo").unwrap();
        assert!(module.obsoletes().is_empty());
        assert_eq!(module.active_obsoletes("latest", None), None);
        Ok(())
    }
}
