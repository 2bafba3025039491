//! Key-binding profiles
//!
//! The emulation does not translate keys to byte sequences itself; it only
//! records which named profile the session uses. Profiles live in an
//! external registry so embedders can ship their own sets, typically
//! deserialized from TOML alongside the session configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE: &str = "default";

/// A named key-binding profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindingProfile {
    pub name: String,
    pub description: String,
}

impl Default for KeyBindingProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE.to_string(),
            description: "Built-in default bindings".to_string(),
        }
    }
}

/// Registry of profiles, looked up by name.
///
/// Lookup returns `None` for unknown names; callers decide whether to fall
/// back to [`default_profile`](Self::default_profile).
#[derive(Debug)]
pub struct KeyBindingRegistry {
    profiles: HashMap<String, KeyBindingProfile>,
    default: KeyBindingProfile,
}

impl Default for KeyBindingRegistry {
    fn default() -> Self {
        let default = KeyBindingProfile::default();
        let mut profiles = HashMap::new();
        profiles.insert(default.name.clone(), default.clone());
        Self { profiles, default }
    }
}

impl KeyBindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, profile: KeyBindingProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn find(&self, name: &str) -> Option<&KeyBindingProfile> {
        self.profiles.get(name)
    }

    pub fn default_profile(&self) -> &KeyBindingProfile {
        &self.default
    }
}
