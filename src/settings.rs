use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, RwLock};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "hojear";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_theme")]
    pub theme: String,

    /// URL of the translation endpoint. Unset disables translation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_endpoint: Option<String>,

    #[serde(default = "default_translate_language")]
    pub translate_language: String,

    /// True once the user declined the install banner.
    #[serde(default)]
    pub install_prompt_dismissed: bool,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_theme() -> String {
    "Dark".to_string()
}

fn default_translate_language() -> String {
    "Spanish".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: default_theme(),
            translate_endpoint: None,
            translate_language: default_translate_language(),
            install_prompt_dismissed: false,
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

/// When set, settings are neither loaded from nor written to disk.
static EPHEMERAL: AtomicBool = AtomicBool::new(false);

pub fn set_ephemeral(ephemeral: bool) {
    EPHEMERAL.store(ephemeral, Ordering::Relaxed);
}

fn is_ephemeral() -> bool {
    EPHEMERAL.load(Ordering::Relaxed)
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    if is_ephemeral() {
        return;
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

fn load_settings_from_path(path: &PathBuf) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // Future migrations go here:
    // if settings.version < 2 {
    //     migrate_v1_to_v2(settings);
    // }

    settings.version = CURRENT_VERSION;
}

pub fn save_settings() {
    if is_ephemeral() {
        return;
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, cannot save settings");
        return;
    };

    if let Ok(settings) = SETTINGS.read() {
        save_settings_to_file(&settings, &path);
    }
}

fn save_settings_to_file(settings: &Settings, path: &PathBuf) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("theme: \"{}\"\n", settings.theme));
    content.push('\n');

    content.push_str(TRANSLATE_TEMPLATE);
    if let Some(endpoint) = &settings.translate_endpoint {
        content.push_str(&format!("translate_endpoint: \"{endpoint}\"\n"));
    }
    content.push_str(&format!(
        "translate_language: \"{}\"\n",
        settings.translate_language
    ));
    content.push('\n');

    content.push_str(&format!(
        "install_prompt_dismissed: {}\n",
        settings.install_prompt_dismissed
    ));

    content
}

const TRANSLATE_TEMPLATE: &str = r#"# ============================================================================
# Translation
# ============================================================================
# Point translate_endpoint at a service accepting POST JSON
#   {"text": "...", "targetLanguage": "Spanish"}
# and answering
#   {"translatedText": "..."}
# The HOJEAR_TRANSLATE_URL environment variable overrides this value.
#
# Example:
#   translate_endpoint: "https://example.com/functions/v1/translate"

"#;

// Public API for accessing/modifying settings

pub fn get_theme_name() -> String {
    SETTINGS
        .read()
        .map(|s| s.theme.clone())
        .unwrap_or_else(|_| default_theme())
}

pub fn set_theme_name(name: &str) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.theme = name.to_string();
    }
    save_settings();
}

pub fn get_translate_endpoint() -> Option<String> {
    SETTINGS
        .read()
        .ok()
        .and_then(|s| s.translate_endpoint.clone())
}

pub fn set_translate_endpoint(endpoint: Option<String>) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.translate_endpoint = endpoint;
    }
    save_settings();
}

pub fn get_translate_language() -> String {
    SETTINGS
        .read()
        .map(|s| s.translate_language.clone())
        .unwrap_or_else(|_| default_translate_language())
}

pub fn set_translate_language(language: &str) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.translate_language = language.to_string();
    }
    save_settings();
}

pub fn is_install_prompt_dismissed() -> bool {
    SETTINGS
        .read()
        .map(|s| s.install_prompt_dismissed)
        .unwrap_or(false)
}

pub fn set_install_prompt_dismissed(dismissed: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.install_prompt_dismissed = dismissed;
    }
    save_settings();
}
