//! Configuration for the `quillt` CLI.
//!
//! Mirrors `faxt::config::Config`'s load/save/search-path behavior
//! exactly (current directory, then `~/.config/quillt/`, then the
//! platform config directory), with persisted defaults relevant to this
//! CLI rather than `faxt`'s build/convert settings.

use dirs::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{QuilltError, Result};

pub const CONFIG_FILE_NAME: &str = "quillt.toml";

/// Persisted CLI defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub verbose: bool,

    /// Default program file to run when `quillt run` is given no path.
    #[serde(default)]
    pub default_program: Option<String>,

    #[serde(default)]
    pub vm: VmSettings,
}

/// The subset of `quillc_vm::VmConfig` exposed as persisted CLI defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmSettings {
    #[serde(default = "default_initial_stack_slots")]
    pub initial_stack_slots: usize,

    #[serde(default)]
    pub enable_debug_trace: bool,

    #[serde(default = "default_unicode_policy")]
    pub unicode_policy: String,
}

fn default_initial_stack_slots() -> usize {
    256
}

fn default_unicode_policy() -> String {
    "surrogate-escape".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            default_program: None,
            vm: VmSettings::default(),
        }
    }
}

impl Default for VmSettings {
    fn default() -> Self {
        Self {
            initial_stack_slots: default_initial_stack_slots(),
            enable_debug_trace: false,
            unicode_policy: default_unicode_policy(),
        }
    }
}

impl VmSettings {
    /// Translate the persisted string policy into the VM's own enum,
    /// defaulting to `SurrogateEscape` on an unrecognized value rather
    /// than failing the whole config load over a typo.
    pub fn to_unicode_policy(&self) -> quillc_vm::UnicodePolicy {
        match self.unicode_policy.as_str() {
            "fail" => quillc_vm::UnicodePolicy::Fail,
            "replace-with-fffd" => quillc_vm::UnicodePolicy::ReplaceWithFffd,
            _ => quillc_vm::UnicodePolicy::SurrogateEscape,
        }
    }

    pub fn to_vm_config(&self) -> quillc_vm::VmConfig {
        quillc_vm::VmConfig {
            initial_stack_slots: self.initial_stack_slots,
            enable_debug_trace: self.enable_debug_trace,
            unicode_policy: self.to_unicode_policy(),
            ..Default::default()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::find_config_file()? {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuilltError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| QuilltError::Config(format!("failed to parse configuration: {e}")))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuilltError::Config(format!("failed to serialize configuration: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    fn check_home_config() -> Option<PathBuf> {
        home_dir()
            .map(|dir| dir.join(".config").join("quillt").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn check_system_config() -> Option<PathBuf> {
        config_dir()
            .map(|dir| dir.join("quillt").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn find_config_file() -> Result<Option<PathBuf>> {
        Ok(Self::check_current_dir_config()
            .or_else(Self::check_home_config)
            .or_else(Self::check_system_config))
    }
}
