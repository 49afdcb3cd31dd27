//! Registry of the user functions a tape refers to: opaque functions used by
//! `Call` and `Map` usages, and discrete functions used by `Dis` usages.
//!
//! A tape never holds a pointer to a function object: the usage header stores
//! the function's id, which is its insertion index in one of the append-only
//! tables. Ids stay valid for the lifetime of the registry, so recorded (and
//! serialized) tapes can be replayed against it at any time.

use crate::error::TapeError;
use crate::op::OpEnum;
use crate::traits::Scalar;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two id spaces of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpaqueFamily {
    /// Ordinary function semantics.
    Call,
    /// Elementwise / broadcast functions.
    Map,
}

impl OpaqueFamily {
    /// The operator kind that records a usage of this family.
    pub fn op_enum(self) -> OpEnum {
        match self {
            OpaqueFamily::Call => OpEnum::Call,
            OpaqueFamily::Map => OpEnum::Map,
        }
    }
}

impl fmt::Display for OpaqueFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueFamily::Call => f.write_str("call"),
            OpaqueFamily::Map => f.write_str("map"),
        }
    }
}

/// A function whose numeric behaviour and dependency structure are supplied
/// by user code instead of being visible on the tape.
///
/// `call_id` lets one object serve several configurations; the pair
/// (function id, `call_id`) must determine the input and result counts.
pub trait OpaqueFunction<V: Scalar> {
    fn name(&self) -> &str;

    /// Computes `y` from `x`. `y.len()` is the recorded result count.
    fn forward(&self, call_id: usize, x: &[V], y: &mut [V]) -> Result<()>;

    /// For every `depend_y[j]` that is true, sets `depend_x[i]` for every input
    /// that can influence result `j`. `depend_x` arrives all false.
    ///
    /// Over-approximation only costs speed. Leaving out a real dependency lets
    /// dead code elimination drop live usages.
    fn rev_depend(&self, call_id: usize, depend_y: &[bool], depend_x: &mut [bool]) -> Result<()>;

    /// Sets `constant_y[j]` when result `j` is a constant given which inputs
    /// are constants. The default asks `rev_depend` one result at a time.
    fn for_type(&self, call_id: usize, constant_x: &[bool], constant_y: &mut [bool]) -> Result<()> {
        let mut depend_y = vec![false; constant_y.len()];
        let mut depend_x = vec![false; constant_x.len()];
        for j in 0..constant_y.len() {
            depend_y.fill(false);
            depend_y[j] = true;
            depend_x.fill(false);
            self.rev_depend(call_id, &depend_y, &mut depend_x)?;
            constant_y[j] = depend_x
                .iter()
                .zip(constant_x)
                .all(|(&depends, &constant)| !depends || constant);
        }
        Ok(())
    }
}

/// A piecewise-constant function of one value, such as rounding or a table
/// lookup. Its derivative is zero wherever it exists, so it carries no
/// dependency information beyond its single argument.
pub trait DiscreteFunction<V: Scalar> {
    fn name(&self) -> &str;

    fn eval(&self, x: V) -> V;
}

struct Entry<V: Scalar> {
    name: String,
    // None once deleted; the slot (and so the id) is never reused.
    function: Option<Box<dyn OpaqueFunction<V>>>,
}

/// Owner of every registered opaque function.
///
/// Pass it by reference to evaluation and to the passes that may invoke an
/// entry; it must outlive every tape that refers to its ids.
pub struct Registry<V: Scalar> {
    calls: Vec<Entry<V>>,
    maps: Vec<Entry<V>>,
    discrete: Vec<Box<dyn DiscreteFunction<V>>>,
}

impl<V: Scalar> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Scalar> fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |table: &[Entry<V>]| -> Vec<String> {
            table
                .iter()
                .map(|entry| match entry.function {
                    Some(_) => entry.name.clone(),
                    None => format!("{} (deleted)", entry.name),
                })
                .collect()
        };
        f.debug_struct("Registry")
            .field("calls", &names(&self.calls))
            .field("maps", &names(&self.maps))
            .field(
                "discrete",
                &self.discrete.iter().map(|function| function.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<V: Scalar> Registry<V> {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            maps: Vec::new(),
            discrete: Vec::new(),
        }
    }

    fn table(&self, family: OpaqueFamily) -> &[Entry<V>] {
        match family {
            OpaqueFamily::Call => &self.calls,
            OpaqueFamily::Map => &self.maps,
        }
    }

    fn table_mut(&mut self, family: OpaqueFamily) -> &mut Vec<Entry<V>> {
        match family {
            OpaqueFamily::Call => &mut self.calls,
            OpaqueFamily::Map => &mut self.maps,
        }
    }

    /// Takes ownership of `function` and returns its id within `family`.
    pub fn register(&mut self, family: OpaqueFamily, function: Box<dyn OpaqueFunction<V>>) -> usize {
        let table = self.table_mut(family);
        let id = table.len();
        log::trace!("registry: {family} function {id} = {}", function.name());
        table.push(Entry {
            name: function.name().to_string(),
            function: Some(function),
        });
        id
    }

    /// Registers a call function; the result is its `function_id`.
    pub fn register_call<F: OpaqueFunction<V> + 'static>(&mut self, function: F) -> usize {
        self.register(OpaqueFamily::Call, Box::new(function))
    }

    /// Registers a map function; the result is its `map_id`.
    pub fn register_map<F: OpaqueFunction<V> + 'static>(&mut self, function: F) -> usize {
        self.register(OpaqueFamily::Map, Box::new(function))
    }

    /// Registers a discrete function; the result is its `discrete_id`.
    /// Discrete functions are never deleted.
    pub fn register_dis<F: DiscreteFunction<V> + 'static>(&mut self, function: F) -> usize {
        let id = self.discrete.len();
        log::trace!("registry: discrete function {id} = {}", function.name());
        self.discrete.push(Box::new(function));
        id
    }

    pub(crate) fn discrete(&self, id: usize) -> Result<&dyn DiscreteFunction<V>> {
        match self.discrete.get(id) {
            Some(function) => Ok(function.as_ref()),
            None => Err(TapeError::UnknownDiscrete { id }.into()),
        }
    }

    /// Number of ids handed out in `family`, deleted ones included.
    pub fn len(&self, family: OpaqueFamily) -> usize {
        self.table(family).len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.maps.is_empty() && self.discrete.is_empty()
    }

    /// Number of entries, over both families, that have not been deleted.
    pub fn live(&self) -> usize {
        self.calls
            .iter()
            .chain(self.maps.iter())
            .filter(|entry| entry.function.is_some())
            .count()
    }

    pub fn is_deleted(&self, family: OpaqueFamily, id: usize) -> bool {
        self.table(family)
            .get(id)
            .map_or(false, |entry| entry.function.is_none())
    }

    pub fn name(&self, family: OpaqueFamily, id: usize) -> Option<&str> {
        self.table(family).get(id).map(|entry| entry.name.as_str())
    }

    pub fn get(&self, family: OpaqueFamily, id: usize) -> Result<&dyn OpaqueFunction<V>> {
        let entry = self
            .table(family)
            .get(id)
            .ok_or(TapeError::UnknownFunction { family, id })?;
        match entry.function.as_deref() {
            Some(function) => Ok(function),
            None => Err(TapeError::DeletedFunction { family, id }.into()),
        }
    }

    /// Drops the function object. Its id stays reserved; usages that refer to
    /// it fail from now on.
    pub fn delete(&mut self, family: OpaqueFamily, id: usize) -> Result<()> {
        let entry = self
            .table_mut(family)
            .get_mut(id)
            .ok_or(TapeError::UnknownFunction { family, id })?;
        if entry.function.take().is_none() {
            return Err(TapeError::DeletedFunction { family, id }.into());
        }
        log::trace!("registry: {family} function {id} deleted");
        Ok(())
    }

    /// Forgets every opaque function id. Only legal once every opaque entry
    /// has been deleted; discrete functions stay registered.
    pub fn clear(&mut self) -> Result<()> {
        let live = self.live();
        if live > 0 {
            return Err(TapeError::RegistryInUse { live }.into());
        }
        self.calls.clear();
        self.maps.clear();
        Ok(())
    }

    pub(crate) fn forward(
        &self,
        family: OpaqueFamily,
        id: usize,
        call_id: usize,
        x: &[V],
        y: &mut [V],
    ) -> Result<()> {
        let function = self.get(family, id)?;
        function.forward(call_id, x, y).map_err(|err| {
            TapeError::ForwardFailed {
                family,
                id,
                name: function.name().to_string(),
                reason: format!("{err:#}"),
            }
            .into()
        })
    }

    pub(crate) fn rev_depend(
        &self,
        family: OpaqueFamily,
        id: usize,
        call_id: usize,
        depend_y: &[bool],
        depend_x: &mut [bool],
    ) -> Result<()> {
        let function = self.get(family, id)?;
        depend_x.fill(false);
        function.rev_depend(call_id, depend_y, depend_x).map_err(|err| {
            TapeError::RevDependFailed {
                family,
                id,
                name: function.name().to_string(),
                reason: format!("{err:#}"),
            }
            .into()
        })
    }

    pub(crate) fn for_type(
        &self,
        family: OpaqueFamily,
        id: usize,
        call_id: usize,
        constant_x: &[bool],
        constant_y: &mut [bool],
    ) -> Result<()> {
        let function = self.get(family, id)?;
        constant_y.fill(false);
        function.for_type(call_id, constant_x, constant_y).map_err(|err| {
            TapeError::ForTypeFailed {
                family,
                id,
                name: function.name().to_string(),
                reason: format!("{err:#}"),
            }
            .into()
        })
    }
}
