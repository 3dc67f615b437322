use rand::Rng;
use tracing::info;

use crate::config::TrainerConfig;
use crate::controller::trainer::DqnTrainerController;
use crate::controller::{Action, Controller, GameState};
use crate::error::ControllerError;

#[derive(Clone, Debug)]
pub struct Step<S> {
    pub next_state: S,
    pub reward: f32,
    pub done: bool,
}

/// A game the controllers can be run against. Implemented by the engine.
pub trait Environment {
    type State: GameState;

    fn reset(&mut self) -> Self::State;
    fn step(&mut self, action: &Action) -> Step<Self::State>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: f32,
    // zero when the episode was only played
    pub mean_loss: f32,
    // score + turn of the final state
    pub fitness: f32,
}

fn fitness<S: GameState>(state: &S) -> f32 {
    state.score() + state.turn() as f32
}

// stops on `done` or after `max_steps`
pub fn play_episode<E, C>(env: &mut E, controller: &mut C, max_steps: usize) -> Result<EpisodeSummary, ControllerError>
where
    E: Environment,
    C: Controller<E::State>,
{
    let mut state = env.reset();
    let mut summary = EpisodeSummary::default();

    while summary.steps < max_steps {
        let action = controller.get_action(&state)?;
        let step = env.step(&action);
        summary.steps += 1;
        summary.total_reward += step.reward;
        state = step.next_state;
        if step.done {
            break;
        }
    }

    summary.fitness = fitness(&state);
    Ok(summary)
}

pub fn train_episode<E, R>(env: &mut E, trainer: &mut DqnTrainerController<R>, max_steps: usize) -> Result<EpisodeSummary, ControllerError>
where
    E: Environment,
    R: Rng,
{
    let mut state = env.reset();
    let mut summary = EpisodeSummary::default();
    let mut loss_sum = 0.0;

    while summary.steps < max_steps {
        let action = trainer.get_action(&state)?;
        let step = env.step(&action);
        loss_sum += trainer.train(&state, &action, &step.next_state, step.reward);
        summary.steps += 1;
        summary.total_reward += step.reward;
        state = step.next_state;
        if step.done {
            break;
        }
    }

    if summary.steps > 0 {
        summary.mean_loss = loss_sum / summary.steps as f32;
    }
    summary.fitness = trainer.evaluate(&state);
    Ok(summary)
}

// decays epsilon after every episode
pub fn train<E, R>(env: &mut E, trainer: &mut DqnTrainerController<R>, config: &TrainerConfig) -> Result<Vec<EpisodeSummary>, ControllerError>
where
    E: Environment,
    R: Rng,
{
    let mut summaries = Vec::with_capacity(config.episodes);

    for episode in 0..config.episodes {
        let summary = train_episode(env, trainer, config.max_steps)?;
        info!(
            episode = episode + 1,
            steps = summary.steps,
            total_reward = summary.total_reward,
            mean_loss = summary.mean_loss,
            fitness = summary.fitness,
            epsilon = trainer.epsilon(),
            "episode finished"
        );
        summaries.push(summary);

        let decayed = (trainer.epsilon() * config.epsilon_decay).max(config.min_epsilon.min(trainer.epsilon()));
        trainer.set_epsilon(decayed)?;
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ActionSource;
    use crate::controller::fixtures::{VectorState, left_right_drop};
    use crate::controller::player::DqnPlayerController;
    use crate::network::QNetwork;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // walks a cursor along a 1D track; Right moves forward, reaching the end finishes
    struct Corridor {
        position: u32,
        length: u32,
        turn: u32,
    }

    impl Corridor {
        fn new(length: u32) -> Self {
            Self { position: 0, length, turn: 0 }
        }

        fn state(&self) -> VectorState {
            let mut features = vec![0.0; 10];
            features[self.position.min(9) as usize] = 1.0;
            VectorState {
                features,
                score: self.position as f32 * 10.0,
                turn: self.turn,
            }
        }
    }

    impl Environment for Corridor {
        type State = VectorState;

        fn reset(&mut self) -> VectorState {
            self.position = 0;
            self.turn = 0;
            self.state()
        }

        fn step(&mut self, action: &Action) -> Step<VectorState> {
            self.turn += 1;
            let reward = if action.name == "Right" {
                self.position += 1;
                1.0
            } else {
                -0.1
            };
            Step {
                next_state: self.state(),
                reward,
                done: self.position >= self.length,
            }
        }
    }

    struct AlwaysRight(crate::controller::ActionSet);

    impl ActionSource for AlwaysRight {
        fn actions(&self) -> &crate::controller::ActionSet {
            &self.0
        }
    }

    impl Controller<VectorState> for AlwaysRight {
        fn get_action(&mut self, _state: &VectorState) -> Result<Action, ControllerError> {
            Ok(self.0.get(1).unwrap().clone())
        }
    }

    fn trainer(epsilon: f32) -> DqnTrainerController {
        let network = QNetwork::new(10, 3, &mut StdRng::seed_from_u64(0));
        DqnTrainerController::new(left_right_drop(), network, epsilon, StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn test_play_stops_when_done() {
        let mut env = Corridor::new(4);
        let summary = play_episode(&mut env, &mut AlwaysRight(left_right_drop()), 100).unwrap();

        assert_eq!(summary.steps, 4);
        assert_eq!(summary.total_reward, 4.0);
        assert_eq!(summary.fitness, 40.0 + 4.0);
        assert_eq!(summary.mean_loss, 0.0);
    }

    #[test]
    fn test_play_stops_at_max_steps() {
        let mut env = Corridor::new(1000);
        let network = QNetwork::new(10, 3, &mut StdRng::seed_from_u64(0));
        let mut player = DqnPlayerController::new(left_right_drop(), network).unwrap();

        let summary = play_episode(&mut env, &mut player, 7).unwrap();
        assert_eq!(summary.steps, 7);
    }

    #[test]
    fn test_train_episode_reports_loss_and_fitness() {
        let mut env = Corridor::new(3);
        let mut trainer = trainer(1.0);

        let summary = train_episode(&mut env, &mut trainer, 50).unwrap();

        assert!(summary.steps > 0 && summary.steps <= 50);
        assert!(summary.mean_loss > 0.0);
        assert_eq!(summary.fitness, trainer.evaluate(&env.state()));
    }

    #[test]
    fn test_train_decays_epsilon_to_floor() {
        let mut env = Corridor::new(2);
        let mut trainer = trainer(1.0);
        let config = TrainerConfig {
            episodes: 5,
            max_steps: 20,
            epsilon_decay: 0.5,
            min_epsilon: 0.2,
            ..TrainerConfig::default()
        };

        let summaries = train(&mut env, &mut trainer, &config).unwrap();

        assert_eq!(summaries.len(), 5);
        // 1.0 -> 0.5 -> 0.25 -> floor
        assert!((trainer.epsilon() - 0.2).abs() < 1e-6);
    }
}
