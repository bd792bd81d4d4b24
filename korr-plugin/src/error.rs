use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to load plugin {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol {symbol} not found in plugin {path}: {source}")]
    MissingSymbol {
        path: String,
        symbol: String,
        #[source]
        source: libloading::Error,
    },

    #[cfg(feature = "scripting")]
    #[error("failed to load script plugin {path}: {source}")]
    Script {
        path: String,
        #[source]
        source: mlua::Error,
    },

    #[error("failed to read plugin directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
