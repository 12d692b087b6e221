//! Named, long-lived worker threads.
//!
//! Every loop in the controller (one per sensor group plus the ignition
//! sequencer) runs on its own OS thread for the life of the process.
//! Spawning goes through one helper so each thread gets a readable name
//! and an explicit stack size, and so the caller holds a handle per loop.

use std::io;
use std::thread::{self, JoinHandle};

/// Default worker stack.  Loops keep their buffers inline, so a few
/// kilobytes above the frame size is plenty.
pub const DEFAULT_STACK_KB: usize = 64;

/// Owned handle to a running worker loop.
///
/// Workers never return, so the handle is held rather than joined.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the loop has exited, which only happens on a panic.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn `f` on a named thread with a `stack_kb` KiB stack.
pub fn spawn_worker(
    name: &str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<WorkerHandle> {
    log::info!("Spawning '{}' (stack={}KB)", name, stack_kb);

    let handle = thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)?;

    Ok(WorkerHandle {
        name: name.into(),
        handle,
    })
}
