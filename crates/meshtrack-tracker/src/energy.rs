use std::io::Write;

use meshtrack_optim::{CallbackReturnType, IterationCallback, IterationSummary};

/// Records the cost reported by the optimizer at every iteration.
///
/// Never asks the optimizer to stop.
#[derive(Debug, Clone, Default)]
pub struct EnergyCallback {
    energy_record: Vec<f64>,
}

impl EnergyCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the recorded costs, one `"{index} {cost}"` line each with a 1-based index,
    /// framed by `Energy Started` and `Energy Ended`.
    pub fn print_energy<W: Write + ?Sized>(&self, output: &mut W) -> std::io::Result<()> {
        writeln!(output, "Energy Started")?;
        for (i, energy) in self.energy_record.iter().enumerate() {
            writeln!(output, "{} {}", i + 1, energy)?;
        }
        writeln!(output, "Energy Ended")
    }

    /// Forget all recorded costs so the callback can be reused for another solve.
    pub fn reset(&mut self) {
        self.energy_record.clear();
    }

    /// Recorded costs in call order.
    pub fn energies(&self) -> &[f64] {
        &self.energy_record
    }
}

impl IterationCallback for EnergyCallback {
    fn on_iteration(&mut self, summary: &IterationSummary) -> CallbackReturnType {
        self.energy_record.push(summary.cost);
        CallbackReturnType::Continue
    }
}
