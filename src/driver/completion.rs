// CLASSIFICATION: COMMUNITY
// Filename: completion.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Binary completion semaphore posted from interrupt context.
//!
//! Each transfer arms the completion, which starts a new generation. A post
//! carrying an older generation belongs to an abandoned transfer and is
//! dropped.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{SpiError, SpiResult};

#[derive(Debug, Default)]
struct State {
    generation: u64,
    posted: bool,
}

/// Binary semaphore: any number of posts before a wait count as one.
#[derive(Debug, Default)]
pub struct Completion {
    state: Mutex<State>,
    cond: Condvar,
}

impl Completion {
    /// Create an unposted completion.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the waiter of the current generation.
    pub fn post(&self) {
        self.post_generation(None);
    }

    fn post_generation(&self, generation: Option<u64>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if generation.is_some_and(|g| g != state.generation) {
            return;
        }
        state.posted = true;
        self.cond.notify_one();
    }

    /// Start a new generation and return the signal that completes it.
    ///
    /// Signals handed out by earlier calls stop having any effect.
    #[must_use]
    pub fn arm(self: &Arc<Self>) -> IrqSignal {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation = state.generation.wrapping_add(1);
        state.posted = false;
        IrqSignal {
            completion: Arc::clone(self),
            generation: Some(state.generation),
        }
    }

    /// Block until posted, or until `timeout` elapses. `None` waits forever.
    pub fn wait(&self, timeout: Option<Duration>) -> SpiResult<()> {
        let mut state = self.state.lock().map_err(|_| SpiError::Failure)?;
        match timeout {
            None => {
                while !state.posted {
                    state = self.cond.wait(state).map_err(|_| SpiError::Failure)?;
                }
            }
            Some(budget) => {
                let deadline = Instant::now() + budget;
                while !state.posted {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(SpiError::Timeout);
                    }
                    let (guard, _) = self
                        .cond
                        .wait_timeout(state, deadline - now)
                        .map_err(|_| SpiError::Failure)?;
                    state = guard;
                }
            }
        }
        state.posted = false;
        Ok(())
    }
}

/// Handle given to the HAL so its interrupt path can post the completion.
#[derive(Debug, Clone)]
pub struct IrqSignal {
    completion: Arc<Completion>,
    generation: Option<u64>,
}

impl IrqSignal {
    /// Signal that completes whichever transfer is armed when it fires.
    #[must_use]
    pub fn new(completion: Arc<Completion>) -> Self {
        Self {
            completion,
            generation: None,
        }
    }

    /// Post the completion from interrupt context.
    pub fn post(&self) {
        self.completion.post_generation(self.generation);
    }
}
