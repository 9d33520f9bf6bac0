//! Request Budget Controller
//!
//! Fixed per-run allowance of discretionary outbound calls. The hosting edge
//! hard-fails an invocation that exceeds its subrequest ceiling, so the run
//! has to stop asking before that happens rather than find out mid-flight.

/// Remaining allowance for one aggregation run. Never shared between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBudget {
    ceiling: u32,
    remaining: u32,
    denied: u32,
}

impl RequestBudget {
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            remaining: ceiling,
            denied: 0,
        }
    }

    /// Take one call from the allowance.
    ///
    /// Returns `false` and consumes nothing once the allowance is spent.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            self.denied += 1;
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn consumed(&self) -> u32 {
        self.ceiling - self.remaining
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// How many `try_consume` calls were refused.
    pub fn denied(&self) -> u32 {
        self.denied
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}
