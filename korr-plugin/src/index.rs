use crate::error::PluginError;
use crate::native::NativePlugin;
use crate::trait_def::CorrelationPlugin;
use crate::view::PluginAlertView;
use std::path::Path;

#[cfg(feature = "scripting")]
use crate::script::ScriptPlugin;

/// Discovers and holds every extra correlation plugin found under
/// `corr_modules_dir` (spec.md §4.7): native shared objects always,
/// Lua script modules when built with the `scripting` feature.
#[derive(Default)]
pub struct PluginIndex {
    plugins: Vec<Box<dyn CorrelationPlugin>>,
}

impl std::fmt::Debug for PluginIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginIndex")
            .field("plugin_count", &self.plugins.len())
            .finish()
    }
}

impl PluginIndex {
    /// Enumerate `dir`, loading every recognized module. A missing
    /// directory yields an empty index (no plugins configured); any
    /// load failure (missing symbol, link error, malformed script) is
    /// fatal, per spec.md §4.7.
    pub fn discover(dir: &Path) -> Result<Self, PluginError> {
        let mut plugins: Vec<Box<dyn CorrelationPlugin>> = Vec::new();

        if !dir.exists() {
            return Ok(Self { plugins });
        }

        let entries = std::fs::read_dir(dir).map_err(|source| PluginError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| PluginError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };

            if ext == std::env::consts::DLL_EXTENSION {
                plugins.push(Box::new(NativePlugin::load(&path)?));
                continue;
            }

            #[cfg(feature = "scripting")]
            if ext == "lua" {
                plugins.push(Box::new(ScriptPlugin::load(&path)?));
                continue;
            }
        }

        Ok(Self { plugins })
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// One `(index, weight)` pair per loaded plugin, for the combine
    /// stage's weighted sum (spec.md §4.9).
    pub fn contributions(&self, a: &PluginAlertView, b: &PluginAlertView) -> Vec<(f64, f64)> {
        self.plugins
            .iter()
            .map(|p| (p.index(a, b), p.weight()))
            .collect()
    }
}
