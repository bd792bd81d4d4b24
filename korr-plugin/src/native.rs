use crate::error::PluginError;
use crate::view::PluginAlertView;
use libloading::{Library, Symbol};
use std::path::Path;

type IndexFn = unsafe extern "C" fn(*const PluginAlertView, *const PluginAlertView) -> f64;
type WeightFn = unsafe extern "C" fn() -> f64;

/// A loaded native shared object binding `AI_corr_index`/
/// `AI_corr_index_weight` by symbol name (spec.md §4.7).
///
/// The raw function pointers are copied out of their `Symbol` wrappers at
/// load time (function pointers are `Copy`), so this struct only needs to
/// keep `_library` alive for as long as it exists — no borrowed lifetime
/// to thread through.
pub struct NativePlugin {
    _library: Library,
    index_fn: IndexFn,
    weight_fn: WeightFn,
}

impl std::fmt::Debug for NativePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativePlugin").finish_non_exhaustive()
    }
}

impl NativePlugin {
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let path_str = path.display().to_string();

        // SAFETY: loading a user-provided correlation module is inherently
        // trusting that module, the same assumption any `dlopen` caller makes.
        let library = unsafe { Library::new(path) }.map_err(|source| PluginError::Load {
            path: path_str.clone(),
            source,
        })?;

        let index_fn = unsafe {
            let sym: Symbol<IndexFn> = library.get(b"AI_corr_index\0").map_err(|source| {
                PluginError::MissingSymbol {
                    path: path_str.clone(),
                    symbol: "AI_corr_index".to_string(),
                    source,
                }
            })?;
            *sym
        };

        let weight_fn = unsafe {
            let sym: Symbol<WeightFn> =
                library.get(b"AI_corr_index_weight\0").map_err(|source| PluginError::MissingSymbol {
                    path: path_str.clone(),
                    symbol: "AI_corr_index_weight".to_string(),
                    source,
                })?;
            *sym
        };

        Ok(Self {
            _library: library,
            index_fn,
            weight_fn,
        })
    }

    /// Call the plugin's index function, catching panics across the FFI
    /// boundary. Returns `0.0` and logs on failure, per spec.md §4.7's
    /// "failures at call time ... treated as a zero contribution".
    pub fn index(&self, a: &PluginAlertView, b: &PluginAlertView) -> f64 {
        let index_fn = self.index_fn;
        let a_ptr = a as *const PluginAlertView;
        let b_ptr = b as *const PluginAlertView;
        match std::panic::catch_unwind(|| unsafe { index_fn(a_ptr, b_ptr) }) {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("native plugin AI_corr_index call panicked");
                0.0
            }
        }
    }

    pub fn weight(&self) -> f64 {
        let weight_fn = self.weight_fn;
        match std::panic::catch_unwind(|| unsafe { weight_fn() }) {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("native plugin AI_corr_index_weight call panicked");
                0.0
            }
        }
    }
}
