use std::collections::HashMap;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

use tracing::debug;

use super::{Action, ActionSet, ActionSource, Controller, GameState};
use crate::error::ControllerError;

pub const PROMPT: &str = "Enter action: ";
pub const INVALID_ACTION: &str = "Invalid action";

pub struct HumanController<R, W> {
    actions: ActionSet,
    input_map: HashMap<String, Action>,
    reader: R,
    writer: W,
}

impl HumanController<StdinLock<'static>, Stdout> {
    pub fn stdio<K: Into<String>>(actions: ActionSet, input_map: impl IntoIterator<Item = (K, Action)>) -> Self {
        Self::new(actions, input_map, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> HumanController<R, W> {
    pub fn new<K: Into<String>>(
        actions: ActionSet,
        input_map: impl IntoIterator<Item = (K, Action)>,
        reader: R,
        writer: W,
    ) -> Self {
        Self {
            actions,
            input_map: input_map.into_iter().map(|(k, a)| (k.into(), a)).collect(),
            reader,
            writer,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn resolve(&self, token: &str) -> Option<&Action> {
        let action = self.input_map.get(token)?;
        self.actions.get(action.id)
    }
}

impl<R, W> ActionSource for HumanController<R, W> {
    fn actions(&self) -> &ActionSet {
        &self.actions
    }
}

impl<S: GameState, R: BufRead, W: Write> Controller<S> for HumanController<R, W> {
    // blocks until a valid token arrives; unknown tokens are reported and re-prompted
    fn get_action(&mut self, _state: &S) -> Result<Action, ControllerError> {
        let mut line = String::new();
        loop {
            write!(self.writer, "{PROMPT}")?;
            self.writer.flush()?;

            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(ControllerError::InputClosed);
            }

            let token = line.trim_end_matches(['\n', '\r']);
            if let Some(action) = self.resolve(token) {
                return Ok(action.clone());
            }

            debug!(token, "unrecognised action token");
            writeln!(self.writer, "{INVALID_ACTION}")?;
        }
    }
}
