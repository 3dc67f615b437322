pub mod human;
pub mod player;
pub mod trainer;

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::ControllerError;
use crate::network::QNetwork;
use crate::sequential::tensor::argmax;

// identity is the `id` alone
#[derive(Clone, Debug)]
pub struct Action {
    pub id: usize,
    pub name: String,
}

impl Action {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// ordered by id, fixed once built
#[derive(Clone, Debug)]
pub struct ActionSet {
    actions: Vec<Action>,
    action_map: HashMap<usize, usize>,
}

impl ActionSet {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Result<Self, ControllerError> {
        let mut actions: Vec<Action> = actions.into_iter().collect();
        actions.sort_by_key(|a| a.id);

        let mut action_map = HashMap::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            if action_map.insert(action.id, index).is_some() {
                return Err(ControllerError::DuplicateActionId(action.id));
            }
        }

        Ok(Self {
            actions,
            action_map,
        })
    }

    pub fn get(&self, id: usize) -> Option<&Action> {
        self.action_map.get(&id).map(|&index| &self.actions[index])
    }

    pub fn contains(&self, id: usize) -> bool {
        self.action_map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Action> {
        self.actions.choose(rng)
    }

    // network output `i` must be the score of the action with id `i`
    fn check_aligned(&self, network: &QNetwork) -> Result<(), ControllerError> {
        let outputs = network.output_size();
        if outputs == 0 || self.len() != outputs {
            return Err(ControllerError::ActionCountMismatch {
                actions: self.len(),
                outputs,
            });
        }
        match (0..outputs).find(|id| !self.contains(*id)) {
            Some(id) => Err(ControllerError::MissingActionId(id)),
            None => Ok(()),
        }
    }

    // action with the highest network score, first maximum on ties
    fn greedy(&self, network: &QNetwork, state_vector: &[f32]) -> Result<Action, ControllerError> {
        let scores = network.forward(state_vector);
        let index = argmax(&scores).ok_or(ControllerError::ActionCountMismatch {
            actions: self.len(),
            outputs: 0,
        })?;
        self.get(index)
            .cloned()
            .ok_or(ControllerError::MissingActionId(index))
    }
}

/// What the engine must expose about a game snapshot.
pub trait GameState {
    // fixed length, deterministic for a given snapshot
    fn to_tensor(&self) -> Vec<f32>;
    fn score(&self) -> f32;
    fn turn(&self) -> u32;
}

// action set a controller chooses from
pub trait ActionSource {
    fn actions(&self) -> &ActionSet;
}

/// Picks the next action for a game state.
pub trait Controller<S: GameState>: ActionSource {
    fn get_action(&mut self, state: &S) -> Result<Action, ControllerError>;
}
