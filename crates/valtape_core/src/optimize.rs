//! Pass pipelines.

use crate::registry::Registry;
use crate::tape::Tape;
use crate::traits::Scalar;
use anyhow::{Context, Result};

impl<V: Scalar> Tape<V> {
    /// Renumbering followed by dead code elimination.
    pub fn compress(&self, registry: &Registry<V>) -> Result<Tape<V>> {
        self.renumber()?.dead_code(registry)
    }

    /// Constant folding, renumbering, summation and dead code elimination,
    /// in that order.
    pub fn optimize(&self, registry: &Registry<V>) -> Result<Tape<V>> {
        let before = self.stats();
        let tape = self.fold_con(registry).context("fold_con")?;
        let tape = tape.renumber().context("renumber")?;
        let tape = tape.summation().context("summation")?;
        let tape = tape.dead_code(registry).context("dead_code")?;
        log::debug!("optimize: {before:?} -> {:?}", tape.stats());
        Ok(tape)
    }
}
