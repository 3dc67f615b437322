use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("action id {0} appears more than once in the action set")]
    DuplicateActionId(usize),

    #[error("action set has {actions} actions but the network scores {outputs}")]
    ActionCountMismatch { actions: usize, outputs: usize },

    #[error("network output {0} has no action with that id")]
    MissingActionId(usize),

    #[error("epsilon must be in [0, 1], got {0}")]
    InvalidEpsilon(f32),

    #[error("learning rate must be a positive finite number, got {0}")]
    InvalidLearningRate(f32),

    #[error("input closed before a valid action was entered")]
    InputClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to open checkpoint {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write checkpoint {path}: {source}")]
    Encode {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("failed to decode checkpoint {path}: {source}")]
    Decode {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("checkpoint does not match the network architecture: {0}")]
    ArchitectureMismatch(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
