use crate::models::Profile;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// In-memory profile store: profile key -> session state.
///
/// Profiles are created lazily on first reference and live for the process
/// lifetime. Each profile carries its own async lock so operations against
/// one key serialize while distinct keys proceed concurrently. The map-level
/// `RwLock` is only held for the lookup, never across an await point.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: RwLock<HashMap<String, Arc<Mutex<Profile>>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the per-key handle, creating an empty profile on first use
    pub fn handle(&self, profile_key: &str) -> Arc<Mutex<Profile>> {
        if let Some(existing) = self
            .profiles
            .read()
            .expect("profile map lock poisoned")
            .get(profile_key)
        {
            return Arc::clone(existing);
        }

        let mut map = self.profiles.write().expect("profile map lock poisoned");
        Arc::clone(
            map.entry(profile_key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Profile::default()))),
        )
    }

    /// Number of profiles seen so far
    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .expect("profile map lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
