use directories::UserDirs;
use log::info;
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::collider::PolygonCollider;
use crate::controller::{GestureController, GestureSettings};
use crate::error::{Error, Result};
use crate::gesture::{DEFAULT_WAVE_REPETITIONS, GestureType, MAX_FRAMES_PER_SEGMENT};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_max_frames")]
    pub max_frames_per_segment: u32,
    #[serde(default = "default_wave_repetitions")]
    pub wave_repetitions: u32,
    #[serde(default)]
    pub collinear_epsilon: f64,
}

fn default_max_frames() -> u32 {
    MAX_FRAMES_PER_SEGMENT
}

fn default_wave_repetitions() -> u32 {
    DEFAULT_WAVE_REPETITIONS
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_frames_per_segment: MAX_FRAMES_PER_SEGMENT,
            wave_repetitions: DEFAULT_WAVE_REPETITIONS,
            collinear_epsilon: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gestures {
    pub enabled: Vec<GestureType>,
    #[serde(default = "default_true")]
    pub dedupe: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Gestures {
    fn default() -> Self {
        Self {
            enabled: GestureType::ALL.to_vec(),
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub gestures: Gestures,

    /// gesture name -> action label handed to subscribers
    #[serde(default, deserialize_with = "deserialize_bindings")]
    pub bindings: HashMap<String, String>,
}

fn deserialize_bindings<'de, D>(de: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    for (k, v) in table {
        match v {
            toml::Value::String(s) => {
                out.insert(k, s);
            }
            other => {
                return Err(serde::de::Error::custom(format!(
                    "binding '{}' value must be a string, got {}",
                    k,
                    other.type_str()
                )));
            }
        }
    }
    Ok(out)
}

impl Profile {
    pub fn from_toml_str(txt: &str, origin: &Path) -> Result<Self> {
        let profile: Profile = toml::from_str(txt).map_err(|source| Error::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn builtin_default() -> Result<Self> {
        Self::from_toml_str(default_profile_text(), Path::new("<builtin default>"))
    }

    pub fn validate(&self) -> Result<()> {
        let th = &self.thresholds;
        if th.max_frames_per_segment == 0 {
            return Err(Error::InvalidProfile(
                "thresholds.max_frames_per_segment must be positive".into(),
            ));
        }
        if th.wave_repetitions == 0 {
            return Err(Error::InvalidProfile(
                "thresholds.wave_repetitions must be positive".into(),
            ));
        }
        if !th.collinear_epsilon.is_finite() || th.collinear_epsilon < 0.0 {
            return Err(Error::InvalidProfile(
                "thresholds.collinear_epsilon must be a finite, non-negative number".into(),
            ));
        }
        if self.gestures.enabled.is_empty() {
            return Err(Error::InvalidProfile("gestures.enabled is empty".into()));
        }

        for (k, v) in &self.bindings {
            if k.parse::<GestureType>().is_err() {
                return Err(Error::InvalidProfile(format!(
                    "binding '{k}' does not name a gesture"
                )));
            }
            if v.trim().is_empty() {
                return Err(Error::InvalidProfile(format!("binding '{k}' has empty action")));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.meta.name.as_deref().unwrap_or("unnamed")
    }

    pub fn settings(&self) -> GestureSettings {
        GestureSettings {
            max_frames_per_segment: self.thresholds.max_frames_per_segment,
            wave_repetitions: self.thresholds.wave_repetitions,
            dedupe: self.gestures.dedupe,
        }
    }

    pub fn controller(&self) -> GestureController {
        GestureController::new(&self.gestures.enabled, &self.settings())
    }

    pub fn collider(&self) -> PolygonCollider {
        PolygonCollider::with_epsilon(self.thresholds.collinear_epsilon)
    }

    pub fn action_for(&self, gesture: GestureType) -> Option<&str> {
        self.bindings.get(gesture.as_str()).map(String::as_str)
    }
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

/// Profiles on disk: `<config>/profiles/<name>.toml` plus an `active`
/// pointer file naming the one in use.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    config_dir: PathBuf,
    profiles_dir: PathBuf,
    active_ptr: PathBuf,
}

impl ProfileStore {
    /// `~/.config/posectl`, with the default profile installed if missing.
    pub fn open_default() -> Result<Self> {
        let home = UserDirs::new().ok_or(Error::NoHome)?.home_dir().to_path_buf();
        Self::open(home.join(".config").join("posectl"))
    }

    pub fn open(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        let store = Self {
            profiles_dir: config_dir.join("profiles"),
            active_ptr: config_dir.join("active"),
            config_dir,
        };
        store.install_default()?;
        Ok(store)
    }

    fn install_default(&self) -> Result<()> {
        fs::create_dir_all(&self.profiles_dir)?;

        let def_path = self.profiles_dir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }
        if !self.active_ptr.exists() {
            fs::write(&self.active_ptr, b"default")?;
        }
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    /// File holding the name of the active profile.
    pub fn active_ptr(&self) -> &Path {
        &self.active_ptr
    }

    pub fn active_name(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.active_ptr)?.trim().to_string())
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.toml"))
    }

    pub fn load(&self, name: &str) -> Result<Profile> {
        let path = self.profile_path(name);
        if !path.exists() {
            return Err(Error::ProfileNotFound(path));
        }
        let txt = fs::read_to_string(&path)?;
        Profile::from_toml_str(&txt, &path)
    }

    pub fn load_active(&self) -> Result<(String, Profile)> {
        let name = self.active_name()?;
        let profile = self.load(&name)?;
        Ok((name, profile))
    }

    /// Point `active` at `name`; the profile must exist and parse.
    pub fn set_active(&self, name: &str) -> Result<Profile> {
        let profile = self.load(name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        Ok(profile)
    }

    pub fn list(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}
