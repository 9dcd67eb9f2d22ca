//! Solve outcomes and per-frame diagnostics.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Outcome of a linear solve. Frame-level statuses are the OR of
    /// all substep statuses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SolverStatus: u32 {
        const SUCCESS = 1 << 0;
        /// Breakdown or non-finite values during the solve.
        const NUMERICAL_ISSUE = 1 << 1;
        /// Iteration cap reached before the tolerance.
        const NO_CONVERGENCE = 1 << 2;
        /// Empty system or malformed input; nothing was solved.
        const INVALID_INPUT = 1 << 3;
    }
}

impl SolverStatus {
    /// True for statuses that still produced a usable solution.
    pub fn is_recoverable(self) -> bool {
        !self.contains(SolverStatus::INVALID_INPUT)
    }

    /// True if anything other than `SUCCESS` is set.
    pub fn is_degraded(self) -> bool {
        !(self - SolverStatus::SUCCESS).is_empty()
    }
}

/// Result of one substep's linear solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub iterations: u32,
    /// Relative residual; meaningful only when `status` is `SUCCESS`.
    pub error: f32,
}

impl SolverResult {
    pub fn new(status: SolverStatus, iterations: u32, error: f32) -> Self {
        Self {
            status,
            iterations,
            error,
        }
    }

    /// Nothing was solved.
    pub fn invalid_input() -> Self {
        Self::new(SolverStatus::INVALID_INPUT, 0, 0.0)
    }

    pub fn is_success(&self) -> bool {
        self.status == SolverStatus::SUCCESS
    }
}

/// Aggregate of all substep results of one frame.
///
/// Iteration statistics cover every recorded substep; error statistics
/// only successful ones. Averages are divided by the number of recorded
/// substeps.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// OR of all recorded statuses; empty before the first record.
    pub status: SolverStatus,
    /// Number of recorded substeps.
    pub substeps: u32,
    pub min_iterations: u32,
    pub max_iterations: u32,
    pub avg_iterations: f32,
    pub min_error: f32,
    pub max_error: f32,
    pub avg_error: f32,
    successes: u32,
    iteration_sum: u64,
    error_sum: f32,
}

impl FrameDiagnostics {
    /// Clears all statistics for a new frame.
    pub fn begin(&mut self) {
        *self = Self::default();
    }

    /// Folds one substep result into the frame statistics.
    pub fn record(&mut self, result: &SolverResult) {
        if self.substeps == 0 {
            self.min_iterations = result.iterations;
            self.max_iterations = result.iterations;
        } else {
            self.min_iterations = self.min_iterations.min(result.iterations);
            self.max_iterations = self.max_iterations.max(result.iterations);
        }
        self.iteration_sum += u64::from(result.iterations);

        if result.is_success() {
            if self.successes == 0 {
                self.min_error = result.error;
                self.max_error = result.error;
            } else {
                self.min_error = self.min_error.min(result.error);
                self.max_error = self.max_error.max(result.error);
            }
            self.error_sum += result.error;
            self.successes += 1;
        }

        self.status |= result.status;
        self.substeps += 1;
    }

    /// Computes the averages. Call once after the last substep.
    pub fn finish(&mut self) {
        if self.substeps > 0 {
            let n = self.substeps as f32;
            self.avg_iterations = self.iteration_sum as f32 / n;
            self.avg_error = self.error_sum / n;
        }
    }

    /// Number of substeps that reported `SUCCESS`.
    pub fn success_count(&self) -> u32 {
        self.successes
    }
}
