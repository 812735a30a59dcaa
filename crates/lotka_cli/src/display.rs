use lotka_core::error::SinkError;
use lotka_core::lotka_volterra::max_invariant_drift;
use lotka_core::sweep::{PREDATOR_LABEL, PREY_LABEL, TIME_LABEL};
use lotka_core::{SweepOutput, TrajectorySink};
use std::io::Write;

/// Prints each sweep step as a titled table instead of rendering it.
pub struct ConsoleDisplay<W: Write> {
    out: W,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TrajectorySink for ConsoleDisplay<W> {
    fn accept(&mut self, output: SweepOutput) -> Result<(), SinkError> {
        let solution = &output.solution;
        writeln!(self.out, "{}", output.title())?;
        writeln!(
            self.out,
            "{TIME_LABEL:>12}  {PREY_LABEL:>18}  {PREDATOR_LABEL:>20}"
        )?;
        for (t, state) in solution.grid.points().iter().zip(solution.trajectory.states()) {
            writeln!(self.out, "{t:>12.6}  {:>18.6}  {:>20.6}", state[0], state[1])?;
        }

        for (label, index) in [(PREY_LABEL, 0), (PREDATOR_LABEL, 1)] {
            let summary = solution.trajectory.summary(index);
            writeln!(
                self.out,
                "{label}: min {:.6}, max {:.6}, {} peaks, {} troughs",
                summary.min, summary.max, summary.local_maxima, summary.local_minima
            )?;
        }
        writeln!(
            self.out,
            "invariant drift {:.3e}; steps accepted {}, rejected {}; {} evaluations",
            max_invariant_drift(&solution.trajectory, &output.rates),
            solution.stats.accepted_steps,
            solution.stats.rejected_steps,
            solution.stats.evaluations
        )?;
        writeln!(self.out)?;
        Ok(())
    }
}
