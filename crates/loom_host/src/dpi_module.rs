//! Loads the compiled user DPI shared object and the single dispatch-table
//! symbol `loom_instrument`/`loom_pipeline::dispatch` emit into its
//! generated C source (`spec.md` §4.4.5, §9 "Generated dispatch table as
//! data, not code"). The runtime never calls `dlsym` per function: [`load`]
//! resolves `loom_dispatch_table`/`loom_dispatch_table_len` exactly once and
//! indexes into the resulting array — the same shape of dlopen-a-cdylib
//! module loading this retrieval pack's `ethanuppal-marlin` crate uses to
//! bind a Verilator-generated shared object through `libloading`.

use std::ffi::{c_char, CStr};
use std::path::Path;

use libloading::{Library, Symbol};

use crate::error::RuntimeError;

/// The C layout `loom_pipeline::dispatch::generate_dispatch_table` emits
/// for `loom_dpi_entry_t`. `out_args` is a caller-owned scratch buffer the
/// callback writes any output/inout-direction arguments into, by position
/// among that function's non-input args — the host never knows the
/// user function's C signature, only the register layout `loom_instrument`
/// recorded.
#[repr(C)]
struct RawDpiEntry {
    id: u32,
    name: *const c_char,
    n_args: u32,
    ret_width: u32,
    call: extern "C" fn(*const u32, *mut u32) -> u64,
}

/// One resolved DPI callback. The table is copied out of shared-object
/// memory at load time so later lookups never re-dereference the library.
#[derive(Clone)]
pub struct DpiEntry {
    /// Function ID, matching [`loom_passes::artifacts::DpiFunctionRecord::id`].
    pub id: u32,
    /// Function name, for diagnostics.
    pub name: String,
    /// Number of 32-bit argument registers this function reads.
    pub n_args: u32,
    /// Width of the return value, in bits (0 for `void`).
    pub ret_width: u32,
    call: extern "C" fn(*const u32, *mut u32) -> u64,
}

impl DpiEntry {
    /// Invokes the callback with `args`, writing any output-direction
    /// arguments into `out_args`. The caller is responsible for supplying
    /// exactly [`Self::n_args`] values and an `out_args` buffer sized to
    /// that function's output-direction argument count.
    pub fn call(&self, args: &[u32], out_args: &mut [u32]) -> u64 {
        (self.call)(args.as_ptr(), out_args.as_mut_ptr())
    }
}

/// Resolves a function ID to a callback. [`DpiModule`] is the real,
/// shared-object-backed implementation; tests implement this directly
/// against an in-process stand-in so `loom_host::service` can be exercised
/// without a compiled `cdylib` (`SPEC_FULL.md` §8: no real Verilator
/// binary or user DPI module is available in this workspace's tests).
pub trait Dispatch {
    /// Calls `func_id` with `args`, writing output-direction argument
    /// values into `out_args` (sized to that function's output-direction
    /// argument count), or `None` if no such function exists (the service
    /// loop's "unknown function" recovery path, `spec.md` §7).
    fn call(&self, func_id: u32, args: &[u32], out_args: &mut [u32]) -> Option<u64>;
}

impl Dispatch for DpiModule {
    fn call(&self, func_id: u32, args: &[u32], out_args: &mut [u32]) -> Option<u64> {
        self.entry(func_id).map(|e| e.call(args, out_args))
    }
}

/// The loaded user DPI shared object (`spec.md` §6.4's `-sv_lib`): the
/// `Library` handle kept alive for as long as any [`DpiEntry`] might be
/// called, plus the dispatch table resolved once at load time.
pub struct DpiModule {
    _lib: Library,
    entries: Vec<DpiEntry>,
}

impl DpiModule {
    /// Loads `path` and resolves `loom_dispatch_table`/
    /// `loom_dispatch_table_len`.
    ///
    /// # Safety
    /// This dlopens an arbitrary shared object and later calls function
    /// pointers it exports; soundness depends on that object actually
    /// implementing the `loom_dpi_entry_t` ABI `loomc` generates, not on
    /// anything this loader can check.
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let lib = unsafe { Library::new(path) }?;
        let entries = unsafe {
            let table: Symbol<*const RawDpiEntry> = lib.get(b"loom_dispatch_table\0")?;
            let len_sym: Symbol<*const u32> = lib.get(b"loom_dispatch_table_len\0")?;
            let len = *(*len_sym) as usize;
            let raw = std::slice::from_raw_parts(*table, len);
            raw.iter()
                .map(|e| DpiEntry {
                    id: e.id,
                    name: CStr::from_ptr(e.name).to_string_lossy().into_owned(),
                    n_args: e.n_args,
                    ret_width: e.ret_width,
                    call: e.call,
                })
                .collect()
        };
        Ok(Self { _lib: lib, entries })
    }

    /// Looks up the callback for `func_id`, the way the service loop
    /// resolves a pending-mask bit to a callback each round.
    pub fn entry(&self, func_id: u32) -> Option<&DpiEntry> {
        self.entries.iter().find(|e| e.id == func_id)
    }

    /// Number of functions in the dispatch table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dispatch table is empty (`spec.md` §8's "Zero DPI
    /// functions" boundary case).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_missing_file() {
        let err = DpiModule::load(Path::new("/nonexistent/path/to/libdpi.so"));
        assert!(err.is_err());
    }
}
