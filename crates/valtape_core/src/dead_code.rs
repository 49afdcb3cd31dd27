//! Dead code elimination.

use crate::liveness::compute_liveness;
use crate::record_new::{record_new, Action};
use crate::registry::Registry;
use crate::tape::Tape;
use crate::traits::Scalar;
use anyhow::Result;

impl<V: Scalar> Tape<V> {
    /// Returns a tape without the usages that cannot affect a dependent,
    /// a kept comparison or a kept print.
    ///
    /// Opaque usages with at least one needed result are kept whole; inputs
    /// their needed results do not read are rebound to the zero value.
    pub fn dead_code(&self, registry: &Registry<V>) -> Result<Tape<V>> {
        let liveness = compute_liveness(self, registry)?;
        let actions: Vec<Action<V>> = liveness
            .needed_op
            .iter()
            .zip(liveness.depend_x)
            .map(|(&needed, depend_x)| match (needed, depend_x) {
                (false, _) => Action::Drop,
                (true, Some(depend_x)) => Action::Rebind(depend_x),
                (true, None) => Action::Copy,
            })
            .collect();
        let new = record_new(self, &actions);
        log::debug!(
            "dead_code: usages {} -> {}, arguments {} -> {}, constants {} -> {}",
            self.n_op(),
            new.n_op(),
            self.arg_vec().len(),
            new.arg_vec().len(),
            self.con_vec().len(),
            new.con_vec().len()
        );
        Ok(new)
    }
}
