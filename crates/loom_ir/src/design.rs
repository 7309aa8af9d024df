//! Top-level design container.

use crate::arena::Arena;
use crate::ids::ModuleId;
use crate::module::Module;
use serde::{Deserialize, Serialize};

/// A complete netlist design: every module, keyed by [`ModuleId`], plus the
/// designated top module. Built by the external front-end, mutated in
/// place by every pass, and emitted at the end of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    /// All modules in the design, keyed by [`ModuleId`].
    pub modules: Arena<ModuleId, Module>,
    /// The top-level module.
    pub top: ModuleId,
}

impl Design {
    /// Returns a reference to the top-level module.
    pub fn top_module(&self) -> &Module {
        &self.modules[self.top]
    }

    /// Returns a mutable reference to the top-level module.
    pub fn top_module_mut(&mut self) -> &mut Module {
        &mut self.modules[self.top]
    }

    /// Returns the number of modules in the design.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Finds a module by name.
    pub fn find_module(&self, name: loom_common::Ident) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }
}
