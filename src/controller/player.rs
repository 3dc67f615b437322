use super::{Action, ActionSet, ActionSource, Controller, GameState};
use crate::error::ControllerError;
use crate::network::QNetwork;

// greedy inference only
pub struct DqnPlayerController {
    actions: ActionSet,
    network: QNetwork,
}

impl DqnPlayerController {
    pub fn new(actions: ActionSet, network: QNetwork) -> Result<Self, ControllerError> {
        actions.check_aligned(&network)?;
        Ok(Self { actions, network })
    }

    pub fn network(&self) -> &QNetwork {
        &self.network
    }
}

impl ActionSource for DqnPlayerController {
    fn actions(&self) -> &ActionSet {
        &self.actions
    }
}

impl<S: GameState> Controller<S> for DqnPlayerController {
    fn get_action(&mut self, state: &S) -> Result<Action, ControllerError> {
        self.actions.greedy(&self.network, &state.to_tensor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::fixtures::{left_right_drop, probe_state};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_player_is_deterministic() {
        let network = QNetwork::new(10, 3, &mut StdRng::seed_from_u64(4));
        let mut player = DqnPlayerController::new(left_right_drop(), network).unwrap();
        let state = probe_state(10);

        let first = player.get_action(&state).unwrap();
        assert_eq!(player.actions().get(first.id), Some(&first));
        for _ in 0..25 {
            assert_eq!(player.get_action(&state).unwrap(), first);
        }
    }

    #[test]
    fn test_player_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.bin");
        let trained = QNetwork::new(10, 3, &mut StdRng::seed_from_u64(8));
        trained.save(&path).unwrap();

        let state = probe_state(10);
        let mut direct = DqnPlayerController::new(left_right_drop(), trained).unwrap();
        let mut loaded = DqnPlayerController::new(left_right_drop(), QNetwork::from_checkpoint(&path).unwrap()).unwrap();

        assert_eq!(direct.get_action(&state).unwrap(), loaded.get_action(&state).unwrap());
        assert_eq!(loaded.network().input_size(), 10);
    }
}
