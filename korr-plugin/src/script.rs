use crate::error::PluginError;
use crate::view::PluginAlertView;
use mlua::Lua;
use std::path::Path;

/// A loaded Lua correlation module, binding `AI_corr_index`/
/// `AI_corr_index_weight` global functions. `mlua` is a lighter, more
/// idiomatic Rust embedding than `pyo3` for a sandboxed per-call scoring
/// callback.
#[derive(Debug)]
pub struct ScriptPlugin {
    lua: Lua,
}

impl ScriptPlugin {
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let path_str = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| PluginError::Io {
            path: path_str.clone(),
            source,
        })?;

        let lua = Lua::new();
        lua.load(&source).exec().map_err(|source| PluginError::Script {
            path: path_str.clone(),
            source,
        })?;

        for required in ["AI_corr_index", "AI_corr_index_weight"] {
            let globals = lua.globals();
            let value: mlua::Value = globals.get(required).map_err(|source| PluginError::Script {
                path: path_str.clone(),
                source,
            })?;
            if !matches!(value, mlua::Value::Function(_)) {
                return Err(PluginError::Script {
                    path: path_str.clone(),
                    source: mlua::Error::RuntimeError(format!("{required} is not defined as a function")),
                });
            }
        }

        Ok(Self { lua })
    }

    pub fn index(&self, a: &PluginAlertView, b: &PluginAlertView) -> f64 {
        self.call_index(a, b).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "script plugin AI_corr_index call failed");
            0.0
        })
    }

    fn call_index(&self, a: &PluginAlertView, b: &PluginAlertView) -> mlua::Result<f64> {
        let globals = self.lua.globals();
        let f: mlua::Function = globals.get("AI_corr_index")?;
        f.call((
            (a.gid, a.sid, a.rev, a.timestamp),
            (b.gid, b.sid, b.rev, b.timestamp),
        ))
    }

    pub fn weight(&self) -> f64 {
        self.call_weight().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "script plugin AI_corr_index_weight call failed");
            0.0
        })
    }

    fn call_weight(&self) -> mlua::Result<f64> {
        let globals = self.lua.globals();
        let f: mlua::Function = globals.get("AI_corr_index_weight")?;
        f.call(())
    }
}
