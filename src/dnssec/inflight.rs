//! Collapsing concurrent identical operations into one.
//!
//! [`InFlight`] makes sure that for every key at most one operation runs at
//! any time. The first caller for a key, the leader, runs the operation.
//! Callers arriving while it runs wait for the leader and receive a clone of
//! its result.
//!
//! The registry lock is only held to look up or register a call, never
//! while the operation runs. Locks are taken in the order registry, then
//! call state.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use std::{error, fmt};

//------------ InFlight ------------------------------------------------------

#[derive(Debug)]
pub struct InFlight<K, T> {
    calls: Mutex<HashMap<K, Arc<Call<T>>>>,
}

impl<K: Eq + Hash + Clone, T: Clone> InFlight<K, T> {
    pub fn new() -> Self {
        InFlight {
            calls: Default::default(),
        }
    }

    /// Runs `op` unless an operation for `key` is already running.
    ///
    /// If one is, waits for it and returns its result.
    pub fn execute(&self, key: K, op: impl FnOnce() -> T) -> Result<Flight<T>, FlightError> {
        self.execute_timeout(key, None, op)
    }

    /// Like [`execute`](Self::execute) but with a limit on waiting.
    ///
    /// A caller that has to wait for another call and doesn't see it finish
    /// within `timeout` gets [`FlightError::TimedOut`]. The leader itself is
    /// never limited.
    pub fn execute_timeout(
        &self,
        key: K,
        timeout: Option<Duration>,
        op: impl FnOnce() -> T,
    ) -> Result<Flight<T>, FlightError> {
        let mut calls = self.calls.lock().unwrap();
        if let Some(call) = calls.get(&key).cloned() {
            call.state.lock().unwrap().dups += 1;
            drop(calls);
            return call.wait(timeout);
        }
        let call = Arc::new(Call::new());
        calls.insert(key.clone(), call.clone());
        drop(calls);

        let mut leader = Leader {
            flight: self,
            key,
            call,
            done: false,
        };
        let value = op();
        let dups = leader.finish(Outcome::Done(value.clone()));
        Ok(Flight {
            value,
            shared: false,
            dups,
        })
    }

    /// Returns the number of callers waiting for the call for `key`.
    ///
    /// Returns `None` if no call for the key is running.
    #[cfg(test)]
    pub(crate) fn duplicates(&self, key: &K) -> Option<usize> {
        let calls = self.calls.lock().unwrap();
        calls.get(key).map(|call| call.state.lock().unwrap().dups)
    }

    /// Returns the number of running calls.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Default for InFlight<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

//------------ Flight --------------------------------------------------------

/// The result of a call through [`InFlight`].
#[derive(Clone, Debug)]
pub struct Flight<T> {
    pub value: T,

    /// Whether the value was produced by another caller.
    pub shared: bool,

    /// The number of callers that waited for the value.
    pub dups: usize,
}

//------------ Call ----------------------------------------------------------

#[derive(Debug)]
struct Call<T> {
    state: Mutex<CallState<T>>,
    done: Condvar,
}

#[derive(Debug)]
struct CallState<T> {
    outcome: Outcome<T>,
    dups: usize,
}

#[derive(Debug)]
enum Outcome<T> {
    Pending,
    Done(T),
    Abandoned,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Call {
            state: Mutex::new(CallState {
                outcome: Outcome::Pending,
                dups: 0,
            }),
            done: Condvar::new(),
        }
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<Flight<T>, FlightError> {
        let state = self.state.lock().unwrap();
        let pending = |state: &mut CallState<T>| matches!(state.outcome, Outcome::Pending);
        let state = match timeout {
            None => self.done.wait_while(state, pending).unwrap(),
            Some(timeout) => self.done.wait_timeout_while(state, timeout, pending).unwrap().0,
        };
        match &state.outcome {
            Outcome::Done(value) => Ok(Flight {
                value: value.clone(),
                shared: true,
                dups: state.dups,
            }),
            Outcome::Abandoned => Err(FlightError::Abandoned),
            Outcome::Pending => Err(FlightError::TimedOut),
        }
    }
}

//------------ Leader --------------------------------------------------------

/// Completes the leader's call, also when the operation panics.
struct Leader<'a, K: Eq + Hash + Clone, T: Clone> {
    flight: &'a InFlight<K, T>,
    key: K,
    call: Arc<Call<T>>,
    done: bool,
}

impl<K: Eq + Hash + Clone, T: Clone> Leader<'_, K, T> {
    /// Deregisters the call and hands the outcome to everyone waiting.
    ///
    /// Returns the number of callers that waited.
    fn finish(&mut self, outcome: Outcome<T>) -> usize {
        self.done = true;
        // Once deregistered, no new duplicates can join, so the count read
        // below is final.
        self.flight.calls.lock().unwrap().remove(&self.key);
        let mut state = self.call.state.lock().unwrap();
        state.outcome = outcome;
        self.call.done.notify_all();
        state.dups
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Drop for Leader<'_, K, T> {
    fn drop(&mut self) {
        if !self.done {
            self.finish(Outcome::Abandoned);
        }
    }
}

//------------ FlightError ---------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightError {
    /// Waiting for another caller's result took too long.
    TimedOut,

    /// The caller producing the result gave up without one.
    Abandoned,
}

impl fmt::Display for FlightError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FlightError::TimedOut => f.write_str("timed out waiting for a shared operation"),
            FlightError::Abandoned => f.write_str("shared operation was abandoned"),
        }
    }
}

impl error::Error for FlightError {}

//============ Tests =========================================================
