use crate::error::TapeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Settings controlling which usages the rebuilding passes must keep.
///
/// Every tape carries its own copy; a pass hands it on to the tape it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    /// Keep comparison usages (and their operands) so a replay can still
    /// count comparisons whose outcome changed.
    pub keep_compare: bool,
    /// Keep print usages (and their operands).
    pub keep_print: bool,
    /// Cross-check each opaque `rev_depend` answer against single-result
    /// queries during liveness analysis.
    ///
    /// This only catches answers that disagree with each other. A function
    /// that leaves out the same dependency in every answer passes.
    pub check_rev_depend: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            keep_compare: true,
            keep_print: true,
            check_rev_depend: cfg!(debug_assertions),
        }
    }
}

impl OptimizeOptions {
    /// Sets one option from its textual name and value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let flag = match value {
            "true" => true,
            "false" => false,
            _ => {
                return Err(TapeError::InvalidOptionValue {
                    name: name.to_string(),
                    value: value.to_string(),
                }
                .into())
            }
        };
        match name {
            "keep_compare" => self.keep_compare = flag,
            "keep_print" => self.keep_print = flag,
            "check_rev_depend" => self.check_rev_depend = flag,
            _ => return Err(TapeError::UnknownOption(name.to_string()).into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::OptimizeOptions;

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn defaults_keep_compare_and_print() {
        let options = OptimizeOptions::default();
        assert!(options.keep_compare);
        assert!(options.keep_print);
        assert_eq!(options.check_rev_depend, cfg!(debug_assertions));
    }

    #[test]
    fn set_updates_named_flag() {
        let mut options = OptimizeOptions::default();
        options.set("keep_compare", "false").expect("known option");
        options.set("check_rev_depend", "true").expect("known option");
        assert!(!options.keep_compare);
        assert!(options.keep_print);
        assert!(options.check_rev_depend);
    }

    #[test]
    fn set_rejects_unknown_name_and_value() {
        let mut options = OptimizeOptions::default();
        assert_err_contains(options.set("keep_everything", "true"), "unknown tape option");
        assert_err_contains(options.set("keep_print", "yes"), "expects \"true\"");
        assert!(options.keep_print);
    }
}
