use super::error::{InterruptError, Message};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Step and wall-clock allowance of one top-level evaluation, shared with every nested
/// `eval`/`Function` evaluation it starts.
#[derive(Debug)]
pub struct Budget {
    steps: Cell<u64>,
    start: Cell<Instant>,
    max_steps: u64,
    timeout: Option<Duration>,
}

impl Budget {
    pub fn new(max_steps: u64, timeout_ms: u64) -> Rc<Self> {
        Rc::new(Self {
            steps: Cell::new(0),
            start: Cell::new(Instant::now()),
            max_steps,
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        })
    }

    /// Charges one step, failing once the timeout has elapsed or the step limit is passed.
    pub fn charge(&self) -> Result<(), InterruptError> {
        if let Some(timeout) = self.timeout
            && self.start.get().elapsed() > timeout
        {
            tracing::warn!(steps = self.steps.get(), "evaluation timed out");
            return Err(InterruptError::new(
                Message::ExecutionTimeOut,
                &timeout.as_millis().to_string(),
                None,
            ));
        }
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        if steps > self.max_steps {
            tracing::warn!(max_steps = self.max_steps, "step limit exceeded");
            return Err(InterruptError::new(
                Message::MaxSteps,
                &self.max_steps.to_string(),
                None,
            ));
        }
        Ok(())
    }

    pub fn steps(&self) -> u64 {
        self.steps.get()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.get().elapsed()
    }

    pub fn restart(&self) {
        self.steps.set(0);
        self.start.set(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_limit_trips_after_max() {
        let budget = Budget::new(3, 0);
        for _ in 0..3 {
            budget.charge().unwrap();
        }
        let err = budget.charge().unwrap_err();
        assert_eq!(err.code, 3003);
        assert_eq!(err.message, "Script execution exceeded maximum of 3 steps");
    }

    #[test]
    fn timeout_trips_after_elapsed() {
        let budget = Budget::new(u64::MAX, 1);
        std::thread::sleep(Duration::from_millis(5));
        let err = budget.charge().unwrap_err();
        assert_eq!(err.message, "Script execution timed out after 1ms");
    }

    #[test]
    fn zero_timeout_disables_clock() {
        let budget = Budget::new(10, 0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(budget.charge().is_ok());
        budget.restart();
        assert_eq!(budget.steps(), 0);
    }
}
