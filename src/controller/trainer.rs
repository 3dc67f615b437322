use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{Action, ActionSet, ActionSource, Controller, GameState};
use crate::config::TrainerConfig;
use crate::error::ControllerError;
use crate::network::QNetwork;
use crate::sequential::optimizer::Adam;

pub const DEFAULT_LEARNING_RATE: f32 = 0.001;

// epsilon-greedy, trains its network online one transition at a time
pub struct DqnTrainerController<R = StdRng> {
    actions: ActionSet,
    network: QNetwork,
    epsilon: f32,
    learning_rate: f32,
    rng: R,
}

fn check_epsilon(epsilon: f32) -> Result<f32, ControllerError> {
    if (0.0..=1.0).contains(&epsilon) {
        Ok(epsilon)
    } else {
        Err(ControllerError::InvalidEpsilon(epsilon))
    }
}

fn check_learning_rate(learning_rate: f32) -> Result<f32, ControllerError> {
    if learning_rate.is_finite() && learning_rate > 0.0 {
        Ok(learning_rate)
    } else {
        Err(ControllerError::InvalidLearningRate(learning_rate))
    }
}

impl DqnTrainerController<StdRng> {
    // no seed means OS entropy
    pub fn from_config(actions: ActionSet, network: QNetwork, config: &TrainerConfig) -> Result<Self, ControllerError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(actions, network, config.epsilon, rng)?.with_learning_rate(config.learning_rate)
    }
}

impl<R: Rng> DqnTrainerController<R> {
    pub fn new(actions: ActionSet, network: QNetwork, epsilon: f32, rng: R) -> Result<Self, ControllerError> {
        actions.check_aligned(&network)?;
        Ok(Self {
            actions,
            network,
            epsilon: check_epsilon(epsilon)?,
            learning_rate: DEFAULT_LEARNING_RATE,
            rng,
        })
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Result<Self, ControllerError> {
        self.learning_rate = check_learning_rate(learning_rate)?;
        Ok(self)
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f32) -> Result<(), ControllerError> {
        self.epsilon = check_epsilon(epsilon)?;
        Ok(())
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    pub fn into_network(self) -> QNetwork {
        self.network
    }

    // fresh Adam for every call; returns the loss before the step
    pub fn train<S: GameState>(&mut self, state: &S, action: &Action, next_state: &S, reward: f32) -> f32 {
        let mut optimizer = Adam::new(self.learning_rate);
        let loss = self.network.fit_transition(&state.to_tensor(), action.id, reward, &next_state.to_tensor(), &mut optimizer);

        debug!(action = action.id, reward, loss, "train step");
        loss
    }

    // score plus turns survived
    pub fn evaluate<S: GameState>(&self, state: &S) -> f32 {
        state.score() + state.turn() as f32
    }
}

impl<R> ActionSource for DqnTrainerController<R> {
    fn actions(&self) -> &ActionSet {
        &self.actions
    }
}

impl<S: GameState, R: Rng> Controller<S> for DqnTrainerController<R> {
    fn get_action(&mut self, state: &S) -> Result<Action, ControllerError> {
        if self.rng.random::<f32>() < self.epsilon {
            if let Some(action) = self.actions.choose(&mut self.rng) {
                return Ok(action.clone());
            }
        }
        self.actions.greedy(&self.network, &state.to_tensor())
    }
}
