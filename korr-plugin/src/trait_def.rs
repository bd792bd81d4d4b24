use crate::native::NativePlugin;
use crate::view::PluginAlertView;

/// Uniform interface both native and scripted correlation plugins
/// implement, so the combine stage (§4.9) never cares which kind it's
/// calling.
pub trait CorrelationPlugin: Send {
    fn index(&self, a: &PluginAlertView, b: &PluginAlertView) -> f64;
    fn weight(&self) -> f64;
}

impl CorrelationPlugin for crate::native::NativePlugin {
    fn index(&self, a: &PluginAlertView, b: &PluginAlertView) -> f64 {
        NativePlugin::index(self, a, b)
    }

    fn weight(&self) -> f64 {
        NativePlugin::weight(self)
    }
}

#[cfg(feature = "scripting")]
impl CorrelationPlugin for crate::script::ScriptPlugin {
    fn index(&self, a: &PluginAlertView, b: &PluginAlertView) -> f64 {
        crate::script::ScriptPlugin::index(self, a, b)
    }

    fn weight(&self) -> f64 {
        crate::script::ScriptPlugin::weight(self)
    }
}
