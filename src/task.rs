//! Task control block and the small set of types that describe a task.
//!
//! Everything here is plain data: no scheduling policy lives in this
//! module, only the shape of a task and its lifecycle states. The
//! scheduler that interprets this data lives in [`crate::kernel`].

/// Maximum length, in bytes, of a task name.
///
/// Matches `TASK_NAME_MAX_LENGTH` in `original_source/inc/task.h`.
pub const TASK_NAME_MAX_LENGTH: usize = 16;

/// Priority sentinel reserved for the idle task.
///
/// One past the maximum value a user-supplied `u8` priority can hold, so
/// it can never collide with a real task and is always selected last.
pub const IDLE_TASK_PRIORITY: u16 = 256;

/// A task's entry point: the function it runs from task start to the
/// heat death of the universe (tasks in this kernel are never destroyed,
/// see `spec.md` §3 "Lifecycle").
pub type TaskEntry = fn() -> !;

/// Bounded, fixed-size task name used as the lookup key.
///
/// Longer names are truncated to [`TASK_NAME_MAX_LENGTH`] bytes, mirroring
/// `strncpy(dest, src, sizeof(dest))` in the original C rather than
/// rejecting the name outright.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaskName {
    bytes: [u8; TASK_NAME_MAX_LENGTH],
    len: u8,
}

impl TaskName {
    /// Builds a name from a UTF-8 string slice, truncating to
    /// [`TASK_NAME_MAX_LENGTH`] bytes.
    pub fn new(name: &str) -> Self {
        let src = name.as_bytes();
        let len = src.len().min(TASK_NAME_MAX_LENGTH);
        let mut bytes = [0u8; TASK_NAME_MAX_LENGTH];
        bytes[..len].copy_from_slice(&src[..len]);
        TaskName {
            bytes,
            len: len as u8,
        }
    }

    /// Returns the name as a byte slice, without the zero padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl core::fmt::Debug for TaskName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "{:?}", self.as_bytes()),
        }
    }
}

/// Lifecycle state of a task.
///
/// A plain enum rather than the independent bit flags `original_source`
/// uses: `spec.md` §9 names the flag encoding "an accident of the source
/// and not part of the contract" and recommends exactly this tagged
/// variant.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TaskStatus {
    /// Ready to be scheduled.
    Ready,
    /// Currently selected and executing.
    Running,
    /// Waiting for `delay_units` ticks to elapse.
    Delayed,
    /// Suspended until some task calls `resume_task` with its name.
    Suspended,
}

/// Task control block.
///
/// `stack_pointer` MUST remain the first field: the context-switch
/// primitives in `ports::avr::context` dereference a `*mut Tcb` as if it
/// were a `*mut *mut u8` pointing at this field alone, exactly as
/// `original_source/rtos.c`'s `SaveContext`/`RestoreContext` do through
/// `currentActiveTask`.
#[repr(C)]
pub struct Tcb {
    /// Saved top-of-stack while this task is not running.
    pub(crate) stack_pointer: *mut u8,
    /// Next task in the singly linked task list, or null at the tail.
    pub(crate) next: *mut Tcb,
    /// Remaining delay, in 1 ms ticks. Nonzero iff `status == Delayed`.
    pub(crate) delay_units: u16,
    /// Entry point the task was created with. Never called directly
    /// after creation; kept for bookkeeping, per `spec.md` §3.
    pub(crate) entry: TaskEntry,
    /// Lookup key, unique across all live TCBs.
    pub(crate) name: TaskName,
    /// Numeric priority. Lower value runs first. The idle task holds
    /// [`IDLE_TASK_PRIORITY`], strictly above any user value.
    pub(crate) priority: u16,
    /// Current lifecycle state.
    pub(crate) status: TaskStatus,
}

impl Tcb {
    /// Returns this task's name.
    pub fn name(&self) -> &TaskName {
        &self.name
    }

    /// Returns this task's current priority.
    pub fn priority(&self) -> u16 {
        self.priority
    }

    /// Returns this task's current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }
}
