//! Per-good position state machine driving the replay cursor.

/// Samples fed to the signal generator before each decision point.
pub const LOOKBACK: usize = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Idle,
    /// Bought at `entry`, forced out at `exit`.
    Holding { entry: usize, exit: usize },
}

/// A completed buy/sell pair and whatever the evaluator attached to the buy.
#[derive(Debug, Clone, PartialEq)]
pub struct Round<T> {
    pub entry: usize,
    pub exit: usize,
    pub payload: T,
}

/// Walk indices `LOOKBACK..len - cooldown`, asking `evaluate` for a buy while
/// idle. A buy at `i` holds exactly `cooldown` samples and the next decision
/// is taken at the exit index, so positions never overlap.
pub fn replay<T>(
    len: usize,
    cooldown: usize,
    mut evaluate: impl FnMut(usize) -> Option<T>,
) -> Vec<Round<T>> {
    let cooldown = cooldown.max(1);
    let mut rounds = Vec::new();
    let mut state = PositionState::Idle;
    let mut cursor = LOOKBACK;

    while cursor + cooldown < len {
        state = match state {
            PositionState::Idle => match evaluate(cursor) {
                Some(payload) => {
                    let exit = cursor + cooldown;
                    rounds.push(Round {
                        entry: cursor,
                        exit,
                        payload,
                    });
                    PositionState::Holding {
                        entry: cursor,
                        exit,
                    }
                }
                None => {
                    cursor += 1;
                    PositionState::Idle
                }
            },
            PositionState::Holding { exit, .. } => {
                cursor = exit;
                PositionState::Idle
            }
        };
    }

    rounds
}
