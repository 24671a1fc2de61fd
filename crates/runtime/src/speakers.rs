//! Process-wide registry of default speaker profiles.
//!
//! Profiles live in a directory as `<lang>_<name>.json`. The registry is
//! loaded once and never mutated afterwards, so readers need no locking.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{info, warn};
use tts_core::{Lang, SpeakerProfile, TtsError, TtsResult};

use crate::speaker::load_speaker;

static GLOBAL: OnceCell<SpeakerRegistry> = OnceCell::new();

/// Named speaker profiles keyed by language.
#[derive(Debug, Clone, Default)]
pub struct SpeakerRegistry {
    speakers: HashMap<(Lang, String), Arc<SpeakerProfile>>,
}

fn parse_file_name(path: &Path) -> Option<(Lang, String)> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (lang, name) = stem.split_once('_')?;
    if name.is_empty() {
        return None;
    }
    Some((lang.parse().ok()?, name.to_lowercase()))
}

impl SpeakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<lang>_<name>.json` profile in a directory.
    ///
    /// Files with other names are skipped. A profile whose language differs
    /// from its file name is a `Serialization` error.
    pub fn load_dir(dir: impl AsRef<Path>) -> TtsResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| TtsError::ModelLoad {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut registry = Self::new();
        for entry in entries {
            let path = entry?.path();
            let Some((lang, name)) = parse_file_name(&path) else {
                warn!(path = %path.display(), "skipping file without <lang>_<name>.json name");
                continue;
            };
            let profile = load_speaker(&path)?;
            if profile.language() != lang {
                return Err(TtsError::serialization(format!(
                    "{} holds a {} profile",
                    path.display(),
                    profile.language()
                )));
            }
            registry.insert(name, profile);
        }

        info!(dir = %dir.display(), speakers = registry.len(), "loaded speaker registry");
        Ok(registry)
    }

    /// Add or replace a profile under its own language.
    pub fn insert(&mut self, name: impl Into<String>, profile: SpeakerProfile) {
        let key = (profile.language(), name.into().to_lowercase());
        self.speakers.insert(key, Arc::new(profile));
    }

    /// Look up a speaker; names are case-insensitive.
    pub fn get(&self, lang: Lang, name: &str) -> Option<Arc<SpeakerProfile>> {
        self.speakers.get(&(lang, name.to_lowercase())).cloned()
    }

    /// Sorted speaker names for a language.
    pub fn names(&self, lang: Lang) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .speakers
            .keys()
            .filter(|(l, _)| *l == lang)
            .map(|(_, n)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

/// Install the process-wide registry.
///
/// Fails with `Config` when a registry is already installed.
pub fn install(registry: SpeakerRegistry) -> TtsResult<&'static SpeakerRegistry> {
    GLOBAL
        .set(registry)
        .map_err(|_| TtsError::config("speaker registry is already installed"))?;
    GLOBAL
        .get()
        .ok_or_else(|| TtsError::internal("speaker registry vanished after install"))
}

/// Load the process-wide registry from a directory on first call.
///
/// Later calls return the registry already installed, whatever directory
/// they name.
pub fn init_from_dir(dir: impl AsRef<Path>) -> TtsResult<&'static SpeakerRegistry> {
    GLOBAL.get_or_try_init(|| SpeakerRegistry::load_dir(dir))
}

/// The process-wide registry, if one is installed.
pub fn global() -> Option<&'static SpeakerRegistry> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speaker::save_speaker;
    use tts_core::WordSpan;

    fn profile(lang: Lang) -> SpeakerProfile {
        SpeakerProfile::new(
            lang,
            "ok",
            vec![111, 107],
            vec![300, 301],
            vec![WordSpan::new("ok", 0, 1)],
        )
        .unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            parse_file_name(Path::new("voices/en_Alice.json")),
            Some((Lang::En, "alice".to_string()))
        );
        assert_eq!(
            parse_file_name(Path::new("ko_min_jun.json")),
            Some((Lang::Ko, "min_jun".to_string()))
        );
        assert_eq!(parse_file_name(Path::new("alice.json")), None);
        assert_eq!(parse_file_name(Path::new("fr_alice.json")), None);
        assert_eq!(parse_file_name(Path::new("en_alice.wav")), None);
        assert_eq!(parse_file_name(Path::new("en_.json")), None);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        save_speaker(&profile(Lang::En), dir.path().join("en_bob.json")).unwrap();
        save_speaker(&profile(Lang::En), dir.path().join("en_alice.json")).unwrap();
        save_speaker(&profile(Lang::Ja), dir.path().join("ja_aoi.json")).unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a profile").unwrap();

        let registry = SpeakerRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(Lang::En), vec!["alice", "bob"]);
        assert_eq!(registry.names(Lang::Ja), vec!["aoi"]);
        assert!(registry.names(Lang::Zh).is_empty());
        assert_eq!(*registry.get(Lang::En, "Bob").unwrap(), profile(Lang::En));
        assert!(registry.get(Lang::Ja, "bob").is_none());
    }

    #[test]
    fn test_language_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        save_speaker(&profile(Lang::Zh), dir.path().join("en_wei.json")).unwrap();
        assert!(matches!(
            SpeakerRegistry::load_dir(dir.path()),
            Err(TtsError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_dir() {
        assert!(matches!(
            SpeakerRegistry::load_dir("/nonexistent/speakers"),
            Err(TtsError::ModelLoad { .. })
        ));
    }
}
