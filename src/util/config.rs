//! Layered `.kickstartrc` configuration.
//!
//! Configuration is assembled from up to three YAML files on top of built-in
//! defaults, in ascending priority:
//! - User: `~/.kickstartrc`
//! - Project: `./.kickstartrc`
//! - CLI: the file passed with `--config`
//!
//! A missing file at any level is an empty layer. A value present in a
//! higher-priority layer replaces the lower one; an absent value never does.
//! Tools merge field by field, and `extra_options` merges key by key.
//!
//! ```yaml
//! project:
//!   name: my-app
//! tools:
//!   node: { version: "20.11.0" }
//!   conda: { enabled: false }
//!   codex: { install_via: npm }
//! registry:
//!   npm: https://registry.npmjs.org/
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::core::tool::ToolId;
use crate::util::errors::KickstartError;

/// File name used for user and project configuration.
pub const CONFIG_FILE_NAME: &str = ".kickstartrc";

/// Default npm registry mirror.
pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmmirror.com/";

/// Default Bun registry mirror.
pub const DEFAULT_BUN_REGISTRY: &str = "https://registry.npmmirror.com/";

/// Default PyPI index mirror used by uv.
pub const DEFAULT_PYPI_MIRROR: &str = "https://mirrors.sustech.edu.cn/pypi/web/simple";

/// Default mirror for uv-managed Python builds.
pub const DEFAULT_PYTHON_INSTALL_MIRROR: &str =
    "https://ghfast.top/https://github.com/astral-sh/python-build-standalone/releases/download";

/// Accepted values for `install_via`.
pub const INSTALL_METHODS: [&str; 3] = ["bun", "npm", "brew"];

const TOP_LEVEL_KEYS: [&str; 3] = ["project", "tools", "registry"];
const PROJECT_KEYS: [&str; 1] = ["name"];
const TOOL_KEYS: [&str; 4] = ["enabled", "version", "install_via", "extra_options"];
const REGISTRY_KEYS: [&str; 4] = ["npm", "bun", "pypi", "python_install"];

/// Resolved kickstart configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Project settings
    pub project: ProjectConfig,

    /// Per-tool settings, keyed by tool name
    pub tools: BTreeMap<String, ToolConfig>,

    /// Registry mirrors
    pub registry: RegistryConfig,
}

/// Project settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Settings for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Whether the tool is installed at all
    pub enabled: bool,

    /// Version to install (tool specific syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Package manager used for npm-distributed tools (bun, npm, brew)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_via: Option<String>,

    /// Free-form options passed to the installer
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_options: BTreeMap<String, Value>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            enabled: true,
            version: None,
            install_via: None,
            extra_options: BTreeMap::new(),
        }
    }
}

/// Registry mirror URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub npm: String,
    pub bun: String,
    pub pypi: String,
    pub python_install: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            npm: DEFAULT_NPM_REGISTRY.to_string(),
            bun: DEFAULT_BUN_REGISTRY.to_string(),
            pypi: DEFAULT_PYPI_MIRROR.to_string(),
            python_install: DEFAULT_PYTHON_INSTALL_MIRROR.to_string(),
        }
    }
}

/// One configuration file as written, before merging.
///
/// Every field is optional so that "absent" can be told apart from
/// "present with the default value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub project: Option<ProjectLayer>,
    pub tools: Option<BTreeMap<String, Option<ToolLayer>>>,
    pub registry: Option<RegistryLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectLayer {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolLayer {
    pub enabled: Option<bool>,
    pub version: Option<String>,
    pub install_via: Option<String>,
    pub extra_options: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryLayer {
    pub npm: Option<String>,
    pub bun: Option<String>,
    pub pypi: Option<String>,
    pub python_install: Option<String>,
}

impl ConfigLayer {
    /// Parse a layer from YAML text.
    ///
    /// Text that is not YAML, or whose top level is not a mapping, is a
    /// format error. Unknown keys and mistyped values are validation errors;
    /// all unknown keys are reported together.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, KickstartError> {
        let value: Value =
            serde_yaml::from_str(contents).map_err(|e| KickstartError::ConfigFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        match value {
            Value::Null => return Ok(ConfigLayer::default()),
            Value::Mapping(_) => {}
            _ => {
                return Err(KickstartError::ConfigFormat {
                    path: path.to_path_buf(),
                    message: "top level must be a mapping".to_string(),
                })
            }
        }

        let unknown = unknown_keys(&value);
        if !unknown.is_empty() {
            return Err(KickstartError::ConfigValidation {
                path: Some(path.to_path_buf()),
                errors: unknown,
            });
        }

        serde_yaml::from_value(value).map_err(|e| KickstartError::ConfigValidation {
            path: Some(path.to_path_buf()),
            errors: vec![e.to_string()],
        })
    }

    /// Load a layer from a file. A missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>, KickstartError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(KickstartError::Permission {
                    path: path.to_path_buf(),
                    operation: "read".to_string(),
                })
            }
            Err(e) => {
                return Err(KickstartError::ConfigFormat {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        Self::parse(&contents, path).map(Some)
    }
}

/// Collect unrecognized keys at every level of a raw config document.
fn unknown_keys(value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Value::Mapping(root) = value else {
        return errors;
    };

    for (key, section) in root {
        let key = key_name(key);
        if !TOP_LEVEL_KEYS.contains(&key.as_str()) {
            errors.push(format!("unknown field `{}`", key));
            continue;
        }

        match (key.as_str(), section) {
            ("project", Value::Mapping(fields)) => {
                check_fields(&mut errors, "project", fields, &PROJECT_KEYS);
            }
            ("registry", Value::Mapping(fields)) => {
                check_fields(&mut errors, "registry", fields, &REGISTRY_KEYS);
            }
            ("tools", Value::Mapping(tools)) => {
                for (tool, tool_value) in tools {
                    let tool = key_name(tool);
                    if let Value::Mapping(fields) = tool_value {
                        check_fields(&mut errors, &format!("tools.{}", tool), fields, &TOOL_KEYS);
                    }
                }
            }
            _ => {}
        }
    }

    errors
}

fn check_fields(errors: &mut Vec<String>, section: &str, fields: &serde_yaml::Mapping, known: &[&str]) {
    for (field, _) in fields {
        let field = key_name(field);
        if !known.contains(&field.as_str()) {
            errors.push(format!("unknown field `{}.{}`", section, field));
        }
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

impl ToolConfig {
    /// Merge a layer into this tool's settings (layer takes precedence).
    pub fn merge(&mut self, layer: ToolLayer) {
        if let Some(enabled) = layer.enabled {
            self.enabled = enabled;
        }
        if layer.version.is_some() {
            self.version = layer.version;
        }
        if layer.install_via.is_some() {
            self.install_via = layer.install_via;
        }
        if let Some(extra) = layer.extra_options {
            self.extra_options.extend(extra);
        }
    }
}

impl Config {
    /// Load a configuration file written by [`Config::save`].
    ///
    /// Values missing from the file take their defaults.
    pub fn load(path: &Path) -> Result<Self, KickstartError> {
        match ConfigLayer::load(path)? {
            Some(layer) => {
                let mut config = Config::default();
                config.merge(layer);
                Ok(config)
            }
            None => Err(KickstartError::ConfigFormat {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            }),
        }
    }

    /// Save configuration to a file, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            serde_yaml::to_string(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge a layer into this config (layer takes precedence).
    pub fn merge(&mut self, layer: ConfigLayer) {
        if let Some(project) = layer.project {
            if project.name.is_some() {
                self.project.name = project.name;
            }
        }

        if let Some(tools) = layer.tools {
            for (name, tool) in tools {
                let entry = self.tools.entry(name).or_default();
                if let Some(tool) = tool {
                    entry.merge(tool);
                }
            }
        }

        if let Some(registry) = layer.registry {
            if let Some(npm) = registry.npm {
                self.registry.npm = npm;
            }
            if let Some(bun) = registry.bun {
                self.registry.bun = bun;
            }
            if let Some(pypi) = registry.pypi {
                self.registry.pypi = pypi;
            }
            if let Some(python_install) = registry.python_install {
                self.registry.python_install = python_install;
            }
        }
    }

    /// Settings for a tool, falling back to defaults when not configured.
    pub fn tool(&self, tool: ToolId) -> ToolConfig {
        self.tools.get(tool.as_str()).cloned().unwrap_or_default()
    }

    /// Mutable settings for a tool, inserting defaults when not configured.
    pub fn tool_mut(&mut self, tool: ToolId) -> &mut ToolConfig {
        self.tools.entry(tool.as_str().to_string()).or_default()
    }

    /// Whether a tool is enabled (tools are enabled unless configured otherwise).
    pub fn is_enabled(&self, tool: ToolId) -> bool {
        self.tool(tool).enabled
    }
}

/// Standard config file locations.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// `~/.kickstartrc`
    pub user: PathBuf,
    /// `./.kickstartrc`
    pub project: PathBuf,
    /// `--config PATH`
    pub cli: Option<PathBuf>,
}

/// Resolve configuration from defaults and the user, project and CLI files.
///
/// Order of precedence (highest to lowest):
/// 1. CLI config (`--config`)
/// 2. Project config (`./.kickstartrc`)
/// 3. User config (`~/.kickstartrc`)
/// 4. Defaults
///
/// Each present layer is validated on its own so errors point at the file
/// they came from.
pub fn resolve(paths: &ConfigPaths) -> Result<Config, KickstartError> {
    let mut config = Config::default();

    let layers = [Some(&paths.user), Some(&paths.project), paths.cli.as_ref()];
    for path in layers.into_iter().flatten() {
        match ConfigLayer::load(path)? {
            Some(layer) => {
                let mut standalone = Config::default();
                standalone.merge(layer.clone());
                let errors = validate(&standalone);
                if !errors.is_empty() {
                    return Err(KickstartError::ConfigValidation {
                        path: Some(path.clone()),
                        errors,
                    });
                }

                tracing::debug!("loaded config layer from {}", path.display());
                config.merge(layer);
            }
            None if Some(path) == paths.cli.as_ref() => {
                tracing::warn!("config file {} not found, ignoring", path.display());
            }
            None => {}
        }
    }

    Ok(config)
}

static NVM_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?\d+\.\d+\.\d+$").expect("valid nvm version pattern"));

static NODE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(lts/\*|lts/[a-z-]+|node|stable|v?\d+(\.\d+){0,2})$")
        .expect("valid node version pattern")
});

/// Check a configuration and return every problem found.
pub fn validate(config: &Config) -> Vec<String> {
    let mut errors = Vec::new();

    for name in config.tools.keys() {
        if name.parse::<ToolId>().is_err() {
            errors.push(format!("unknown tool name: {}", name));
        }
    }

    for (name, tool) in &config.tools {
        if let Some(method) = &tool.install_via {
            if !INSTALL_METHODS.contains(&method.as_str()) {
                errors.push(format!(
                    "tools.{}.install_via: invalid value '{}' (expected one of: {})",
                    name,
                    method,
                    INSTALL_METHODS.join(", ")
                ));
            }
        }
    }

    for (name, tool) in &config.tools {
        let (Ok(id), Some(version)) = (name.parse::<ToolId>(), &tool.version) else {
            continue;
        };
        if !version_is_valid(id, version) {
            errors.push(format!(
                "tools.{}.version: '{}' is not a valid version for {}",
                name,
                version,
                id.display_name()
            ));
        }
    }

    let registry = &config.registry;
    for (field, value) in [
        ("npm", &registry.npm),
        ("bun", &registry.bun),
        ("pypi", &registry.pypi),
        ("python_install", &registry.python_install),
    ] {
        if let Err(reason) = check_registry_url(value) {
            errors.push(format!("registry.{}: {}", field, reason));
        }
    }

    errors
}

fn version_is_valid(tool: ToolId, version: &str) -> bool {
    match tool {
        ToolId::Nvm => NVM_VERSION.is_match(version),
        ToolId::Node => NODE_VERSION.is_match(version),
        _ => !version.is_empty() && !version.chars().any(char::is_whitespace),
    }
}

fn check_registry_url(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err("URL is empty".to_string());
    }
    let parsed = url::Url::parse(value).map_err(|e| format!("invalid URL '{}': {}", value, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("unsupported URL scheme '{}' in '{}'", scheme, value)),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    use crate::core::tool::INSTALL_ORDER;

    fn word() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9.]{0,7}"
    }

    fn url() -> impl Strategy<Value = String> {
        "[a-z]{1,8}".prop_map(|host| format!("https://{}.example.com/", host))
    }

    fn install_via() -> impl Strategy<Value = String> {
        prop::sample::select(INSTALL_METHODS.to_vec()).prop_map(String::from)
    }

    fn extra_options() -> impl Strategy<Value = BTreeMap<String, Value>> {
        let value = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z ]{0,10}".prop_map(Value::String),
        ];
        prop::collection::btree_map("[a-z]{1,6}", value, 0..4)
    }

    fn tool_layer() -> impl Strategy<Value = ToolLayer> {
        (
            proptest::option::of(any::<bool>()),
            proptest::option::of(word()),
            proptest::option::of(install_via()),
            proptest::option::of(extra_options()),
        )
            .prop_map(|(enabled, version, install_via, extra_options)| ToolLayer {
                enabled,
                version,
                install_via,
                extra_options,
            })
    }

    fn tool_config() -> impl Strategy<Value = ToolConfig> {
        (
            any::<bool>(),
            proptest::option::of(word()),
            proptest::option::of(install_via()),
            extra_options(),
        )
            .prop_map(|(enabled, version, install_via, extra_options)| ToolConfig {
                enabled,
                version,
                install_via,
                extra_options,
            })
    }

    fn config() -> impl Strategy<Value = Config> {
        let tool_name = prop::sample::select(INSTALL_ORDER.to_vec()).prop_map(|t| t.to_string());
        (
            proptest::option::of(word()),
            prop::collection::btree_map(tool_name, tool_config(), 0..6),
            (url(), url(), url(), url()),
        )
            .prop_map(|(name, tools, (npm, bun, pypi, python_install))| Config {
                project: ProjectConfig { name },
                tools,
                registry: RegistryConfig {
                    npm,
                    bun,
                    pypi,
                    python_install,
                },
            })
    }

    proptest! {
        #[test]
        fn merged_value_comes_from_highest_layer_defining_it(
            layers in prop::collection::vec((proptest::option::of(url()), tool_layer()), 3)
        ) {
            let mut config = Config::default();
            for (npm, tool) in &layers {
                config.merge(ConfigLayer {
                    project: None,
                    tools: Some(BTreeMap::from([("node".to_string(), Some(tool.clone()))])),
                    registry: Some(RegistryLayer {
                        npm: npm.clone(),
                        ..Default::default()
                    }),
                });
            }

            let expected_npm = layers
                .iter()
                .rev()
                .find_map(|(npm, _)| npm.clone())
                .unwrap_or_else(|| DEFAULT_NPM_REGISTRY.to_string());
            prop_assert_eq!(&config.registry.npm, &expected_npm);
            prop_assert_eq!(&config.registry.bun, DEFAULT_BUN_REGISTRY);

            let node = config.tool(ToolId::Node);
            let expected_enabled = layers.iter().rev().find_map(|(_, t)| t.enabled).unwrap_or(true);
            prop_assert_eq!(node.enabled, expected_enabled);
            let expected_version = layers.iter().rev().find_map(|(_, t)| t.version.clone());
            prop_assert_eq!(&node.version, &expected_version);
            let expected_via = layers.iter().rev().find_map(|(_, t)| t.install_via.clone());
            prop_assert_eq!(&node.install_via, &expected_via);

            for (key, value) in &node.extra_options {
                let expected = layers
                    .iter()
                    .rev()
                    .find_map(|(_, t)| t.extra_options.as_ref().and_then(|o| o.get(key)));
                prop_assert_eq!(Some(value), expected);
            }
        }

        #[test]
        fn save_then_load_is_identity(config in config()) {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join(CONFIG_FILE_NAME);

            config.save(&path).unwrap();
            let loaded = Config::load(&path).unwrap();
            prop_assert_eq!(loaded, config);
        }
    }
}
