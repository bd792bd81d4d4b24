//! Correlation plugin discovery and dispatch: native shared objects and,
//! behind the `scripting` feature, Lua script modules (spec.md §4.7).

mod error;
mod index;
mod native;
#[cfg(feature = "scripting")]
mod script;
mod trait_def;
mod view;

pub use error::PluginError;
pub use index::PluginIndex;
pub use native::NativePlugin;
#[cfg(feature = "scripting")]
pub use script::ScriptPlugin;
pub use trait_def::CorrelationPlugin;
pub use view::PluginAlertView;
