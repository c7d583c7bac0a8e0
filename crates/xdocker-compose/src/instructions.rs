//! Built-in service instructions handled before extension dispatch.

use serde_yaml::Value;
use xdocker_common::constants::SKIP_PROFILE;

use crate::model::{ComposeFile, PROFILES, SKIP, render_plain, sequence_entry};

/// Removes every `skip` field. A service whose `skip` renders to `true` or
/// `yes` is moved into the `donotstart` profile, so a plain
/// `docker-compose up` leaves it stopped.
///
/// Returns the names of the skipped services.
pub fn apply_skip(config: &mut ComposeFile) -> Vec<String> {
    let mut skipped = Vec::new();
    for (name, service) in config.services_mut() {
        let Some(value) = service.shift_remove(SKIP) else {
            continue;
        };
        let flag = render_plain(&value).trim().to_ascii_lowercase();
        if flag != "true" && flag != "yes" {
            continue;
        }

        let profile = Value::from(SKIP_PROFILE);
        match sequence_entry(service, PROFILES) {
            Some(profiles) if profiles.contains(&profile) => {}
            Some(profiles) => profiles.push(profile),
            None => {
                tracing::warn!(service = %name, "profiles is not a list, replacing it");
                let _ = service.insert(Value::from(PROFILES), Value::Sequence(vec![profile]));
            }
        }
        tracing::debug!(service = %name, "service skipped");
        skipped.push(name);
    }
    skipped
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::loader::parse_document;

    fn config(doc: &str) -> ComposeFile {
        parse_document(doc, Path::new("t.yml")).expect("parse")
    }

    fn profiles(file: &ComposeFile, service: &str) -> Option<Value> {
        file.service(service).and_then(|s| s.get(PROFILES)).cloned()
    }

    #[test]
    fn truthy_skip_adds_profile() {
        let mut file = config(
            "services:\n  a:\n    skip: true\n  b:\n    skip: \"yes\"\n  c:\n    skip: \"YES\"\n",
        );
        assert_eq!(apply_skip(&mut file), vec!["a", "b", "c"]);
        let expected: Value = serde_yaml::from_str("[donotstart]").expect("yaml");
        for name in ["a", "b", "c"] {
            assert_eq!(profiles(&file, name), Some(expected.clone()));
            assert!(file.service(name).and_then(|s| s.get(SKIP)).is_none());
        }
    }

    #[test]
    fn falsy_skip_is_removed_without_profile() {
        let mut file = config("services:\n  a:\n    skip: false\n  b:\n    skip: 0\n");
        assert!(apply_skip(&mut file).is_empty());
        assert_eq!(file.service("a").map(serde_yaml::Mapping::len), Some(0));
        assert!(profiles(&file, "b").is_none());
    }

    #[test]
    fn existing_profiles_are_extended() {
        let mut file = config("services:\n  a:\n    profiles: [debug]\n    skip: true\n");
        let _ = apply_skip(&mut file);
        let expected: Value = serde_yaml::from_str("[debug, donotstart]").expect("yaml");
        assert_eq!(profiles(&file, "a"), Some(expected));
    }

    #[test]
    fn services_without_skip_are_untouched() {
        let mut file = config("services:\n  a:\n    image: x\n");
        assert!(apply_skip(&mut file).is_empty());
        assert!(profiles(&file, "a").is_none());
    }
}
