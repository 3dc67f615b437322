pub mod sequential;

pub use sequential::tensor::Tensor;
pub use sequential::layer::{
    Layer,
    Dense,
    ReLU,
    Softmax,
};
pub use sequential::loss::{
    Loss,
    MeanSquaredError
};
pub use sequential::optimizer::{
    Optimizer,
    Adam,
};
pub use sequential::Sequential;

pub mod network;

pub use network::QNetwork;

pub mod controller;

pub use controller::{Action, ActionSet, ActionSource, Controller, GameState};
pub use controller::human::HumanController;
pub use controller::player::DqnPlayerController;
pub use controller::trainer::DqnTrainerController;

pub mod session;

pub use session::{Environment, EpisodeSummary, Step};

pub mod config;
pub mod error;

pub use config::{AppConfig, NetworkConfig, TrainerConfig};
pub use error::{CheckpointError, ConfigError, ControllerError};
