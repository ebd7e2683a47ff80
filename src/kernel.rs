//! The kernel: global scheduling state, the task list, the selection
//! algorithm, and the small set of entry points application code calls.
//!
//! Everything mutable here is a `static mut`: a bare-metal kernel with
//! exactly one of itself has no good place to put that state other than
//! statics, and every access to it happens with interrupts disabled,
//! which is this kernel's only synchronization mechanism.

use crate::arena::{Arena, TASK_REGION_SIZE, TCB_STACK_GAP};
use crate::platform::{ActivePlatform, Platform};
use crate::stack_builder::build_initial_frame;
use crate::task::{IDLE_TASK_PRIORITY, TaskEntry, TaskName, TaskStatus, Tcb};
use core::mem::size_of;

/// Head of the singly linked task list. Newly created tasks are
/// prepended here.
pub(crate) static mut HEAD: *mut Tcb = core::ptr::null_mut();

/// Cached tail, kept current by every round-robin re-splice so a
/// freshly demoted task can be appended in O(1).
pub(crate) static mut TAIL: *mut Tcb = core::ptr::null_mut();

/// The task whose context is either executing or was most recently
/// saved. Null only before [`Kernel::start`]'s first selection.
///
/// `pub(crate)` so `ports::avr`'s naked functions can reference it by
/// `sym`.
pub(crate) static mut CURRENT: *mut Tcb = core::ptr::null_mut();

/// Highest writable byte of the scheduler's scratch stack: the region
/// [`Kernel::init`] reserves at the very top of the arena, before
/// carving any task, so that `select_next_task`'s own call frame can
/// never land on top of a TCB.
///
/// `pub(crate)` so `ports::avr`'s naked functions can load it by `sym`.
pub(crate) static mut SCRATCH_STACK_TOP: *mut u8 = core::ptr::null_mut();

/// Number of task regions the arena is allowed to carve, not counting
/// the scratch-stack region. Sized for a 2 KiB ATmega328P-class part:
/// `2048 / TASK_REGION_SIZE - 1`.
const MAX_TASKS: usize = 7;

static mut ARENA: Option<Arena> = None;

/// Set once [`Kernel::start`] has handed off to the scheduler.
/// `create_task` after this point would race the running scheduler over
/// an arena that is no longer safe to carve from.
static mut STARTED: bool = false;

/// Entry point body for the idle task created by [`Kernel::init`].
fn idle_task_entry() -> ! {
    loop {
        ActivePlatform::sleep_until_interrupt();
    }
}

/// Finds the task named `name`, or null if no live task carries it.
unsafe fn find(name: TaskName) -> *mut Tcb {
    let mut node = HEAD;
    while !node.is_null() {
        if (*node).name == name {
            return node;
        }
        node = (*node).next;
    }
    core::ptr::null_mut()
}

/// Prepends `tcb` to the task list, per `spec.md` §3's stated insertion
/// order.
unsafe fn prepend(tcb: *mut Tcb) {
    (*tcb).next = HEAD;
    HEAD = tcb;
    if TAIL.is_null() {
        TAIL = tcb;
    }
}

/// Unlinks `node` from wherever it sits in the list and re-appends it at
/// the tail. No-op if `node` is already the tail — mirroring §4.4 step 4's
/// "if the chosen task has a successor."
unsafe fn splice_to_tail(node: *mut Tcb) {
    if node == TAIL {
        return;
    }
    let mut prev: *mut Tcb = core::ptr::null_mut();
    let mut cur = HEAD;
    while cur != node {
        prev = cur;
        cur = (*cur).next;
    }
    if prev.is_null() {
        HEAD = (*node).next;
    } else {
        (*prev).next = (*node).next;
    }
    (*node).next = core::ptr::null_mut();
    (*TAIL).next = node;
    TAIL = node;
}

/// Carves a fresh region for `entry` and fills in a TCB at its highest
/// addresses, per `spec.md` §3's memory layout.
unsafe fn carve_task(name: TaskName, priority: u16, entry: TaskEntry) -> Option<*mut Tcb> {
    let arena = ARENA.as_mut().expect("Error: carve_task: Kernel::init was not called");
    let region_top = arena.carve()?;
    let tcb_ptr = region_top.sub(size_of::<Tcb>()) as *mut Tcb;
    let stack_top = (tcb_ptr as *mut u8).sub(TCB_STACK_GAP);
    let sp = build_initial_frame(stack_top, entry);
    core::ptr::write(
        tcb_ptr,
        Tcb {
            stack_pointer: sp,
            next: core::ptr::null_mut(),
            delay_units: 0,
            entry,
            name,
            priority,
            status: TaskStatus::Ready,
        },
    );
    Some(tcb_ptr)
}

/// The core selection algorithm, `spec.md` §4.4 steps 1–5: demote
/// `current` if it is still marked Running, scan for the
/// highest-priority Ready task (first-found wins ties), rotate it to the
/// tail if it has a successor, then mark it Running and install it as
/// `current`.
///
/// Never called directly from outside this module; reached only through
/// [`select_next_task`] (voluntary entries, and the boot selection in
/// [`Kernel::start`]) or the tick path (which additionally runs
/// [`decrement_delays`] first).
fn run_selection() {
    unsafe {
        if !CURRENT.is_null() && (*CURRENT).status == TaskStatus::Running {
            (*CURRENT).status = TaskStatus::Ready;
        }

        let mut chosen: *mut Tcb = core::ptr::null_mut();
        let mut node = HEAD;
        while !node.is_null() {
            if (*node).status == TaskStatus::Ready
                && (chosen.is_null() || (*node).priority < (*chosen).priority)
            {
                chosen = node;
            }
            node = (*node).next;
        }
        debug_assert!(
            !chosen.is_null(),
            "Error: run_selection: no Ready task found; the idle task must always be Ready"
        );

        splice_to_tail(chosen);

        (*chosen).status = TaskStatus::Running;
        CURRENT = chosen;
    }
}

/// Decrements every Delayed task's remaining tick count, promoting it to
/// Ready on reaching zero. Runs exactly once per tick, before selection;
/// `spec.md` §4.5 step 2.
///
/// # Safety
///
/// Must only run with interrupts disabled and the task list in a
/// consistent state — true on tick entry and nowhere else, which is why
/// only the tick vector calls this.
#[unsafe(no_mangle)]
pub(crate) unsafe extern "C" fn decrement_delays() {
    let mut node = HEAD;
    while !node.is_null() {
        if (*node).status == TaskStatus::Delayed {
            (*node).delay_units -= 1;
            if (*node).delay_units == 0 {
                (*node).status = TaskStatus::Ready;
            }
        }
        node = (*node).next;
    }
}

/// Runs [`run_selection`] alone, with no delay bookkeeping — the
/// scheduling half of a voluntary kernel call, and also the very first
/// selection `Kernel::start` performs.
///
/// # Safety
///
/// Must only run with interrupts disabled.
#[unsafe(no_mangle)]
pub(crate) unsafe extern "C" fn select_next_task() {
    run_selection();
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "avr")] {
        pub(crate) use crate::ports::avr::context::enter_scheduler;
    } else {
        /// Host stand-in for the real save/switch/restore sequence: runs
        /// the selection algorithm synchronously and returns. There is no
        /// register file to save or restore here — `ports::mok` never
        /// actually executes a task body — so this just applies the
        /// bookkeeping side effect a real context switch would have.
        pub(crate) unsafe fn enter_scheduler() {
            run_selection();
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "avr")] {
        unsafe fn dispatch_first() -> ! {
            crate::ports::avr::context::restore_context()
        }
    } else {
        unsafe fn dispatch_first() -> ! {
            loop {
                ActivePlatform::sleep_until_interrupt();
            }
        }
    }
}

/// The kernel's public surface. A zero-sized handle: all state lives in
/// this module's statics, per `spec.md` §9's note that the replacement
/// design should encapsulate `head`/`tail`/`current`/the stack cursor
/// behind a single record with two lifecycle points, `init` and `start`.
pub struct Kernel;

impl Kernel {
    /// Initializes the stack-area cursor at top-of-RAM, reserves the
    /// top-most region as the scheduler's scratch stack, clears the task
    /// list, creates and enlists the idle task, and configures the 1 ms
    /// timer without yet unmasking its interrupt.
    pub fn init() {
        unsafe {
            HEAD = core::ptr::null_mut();
            TAIL = core::ptr::null_mut();
            CURRENT = core::ptr::null_mut();
            STARTED = false;

            let top = ActivePlatform::ram_top();
            // One extra region beyond MAX_TASKS task slots: the scratch
            // stack carved below, which never holds a TCB.
            let low_water = top.sub((MAX_TASKS + 1) * TASK_REGION_SIZE);
            let mut arena = Arena::new(top, low_water);

            let scratch_region_top = arena
                .carve()
                .expect("Error: Kernel::init: arena too small for the scratch stack");
            // `carve` returns the region's exclusive upper bound; the
            // stack pointer needs the highest *writable* byte, since a
            // `push` stores at SP and only then decrements it.
            SCRATCH_STACK_TOP = scratch_region_top.sub(1);

            ARENA = Some(arena);

            ActivePlatform::configure_tick_timer();

            let idle = carve_task(TaskName::new("idle"), IDLE_TASK_PRIORITY, idle_task_entry)
                .expect("Error: Kernel::init: arena too small for the idle task");
            prepend(idle);
        }
    }

    /// Creates a task, carving a fresh region and synthesizing its
    /// initial stack frame.
    ///
    /// Returns `None` if `name` is already in use or the arena is
    /// exhausted. MUST NOT be called after [`Kernel::start`]; see
    /// `spec.md` §7's note on improper call ordering, which this kernel
    /// leaves as a documented programming contract rather than a checked
    /// error.
    pub fn create_task(name: &str, priority: u16, entry: TaskEntry) -> Option<*mut Tcb> {
        debug_assert!(
            !unsafe { STARTED },
            "Error: create_task: called after Kernel::start; the arena is no longer safe to carve"
        );
        let name = TaskName::new(name);
        unsafe {
            if !find(name).is_null() {
                return None;
            }
            let tcb = carve_task(name, priority, entry)?;
            prepend(tcb);
            Some(tcb)
        }
    }

    /// Looks up a task by name without any scheduling side effect.
    pub fn get_task_by_name(name: &str) -> Option<*mut Tcb> {
        let name = TaskName::new(name);
        unsafe {
            let t = find(name);
            if t.is_null() { None } else { Some(t) }
        }
    }

    /// Returns a task's priority, or `-1` if `name` is unknown.
    pub fn get_task_priority(name: &str) -> i16 {
        let name = TaskName::new(name);
        unsafe {
            let t = find(name);
            if t.is_null() { -1 } else { (*t).priority as i16 }
        }
    }

    /// Updates a task's priority, then runs save+schedule so a task that
    /// just became the highest priority preempts immediately.
    ///
    /// Silently no-ops if `name` is unknown, per `spec.md` §7.
    pub fn set_task_priority(name: &str, priority: u16) {
        let name = TaskName::new(name);
        unsafe {
            ActivePlatform::disable_interrupts();
            let t = find(name);
            if !t.is_null() {
                (*t).priority = priority;
            }
            enter_scheduler();
        }
    }

    /// Suspends the calling task until some other task resumes it by
    /// name.
    pub fn suspend_task() {
        unsafe {
            ActivePlatform::disable_interrupts();
            (*CURRENT).status = TaskStatus::Suspended;
            enter_scheduler();
        }
    }

    /// Marks `name` Ready if it is currently Suspended (or in any other
    /// state — this unconditionally sets Ready, matching `spec.md` §4.4's
    /// `Suspended → Ready` trigger), then runs save+schedule so a
    /// higher-priority resumed task preempts the caller immediately.
    ///
    /// Silently no-ops if `name` is unknown.
    pub fn resume_task(name: &str) {
        let name = TaskName::new(name);
        unsafe {
            ActivePlatform::disable_interrupts();
            let t = find(name);
            if !t.is_null() {
                (*t).status = TaskStatus::Ready;
            }
            enter_scheduler();
        }
    }

    /// Delays the calling task for `units` ticks. A no-op — no state
    /// change, no scheduler call, no observable preemption — if
    /// `units == 0`, per `spec.md` §7.
    pub fn delay_task(units: u16) {
        if units == 0 {
            return;
        }
        unsafe {
            ActivePlatform::disable_interrupts();
            (*CURRENT).delay_units = units;
            (*CURRENT).status = TaskStatus::Delayed;
            enter_scheduler();
        }
    }

    /// Masks interrupts, unmasks the tick-timer compare-match interrupt,
    /// performs the first scheduling decision, and hands control to
    /// whichever task it chose. Never returns.
    pub fn start() -> ! {
        unsafe {
            ActivePlatform::disable_interrupts();
            STARTED = true;
            ActivePlatform::enable_tick_interrupt();
            select_next_task();
            dispatch_first()
        }
    }

    /// Runs one simulated tick: delay accounting followed by selection,
    /// exactly what the real tick ISR does between saving and restoring
    /// a register file. Lets `ports::mok`-backed tests drive the
    /// scheduler without real hardware or a timer interrupt.
    pub fn step_tick() {
        unsafe {
            decrement_delays();
            select_next_task();
        }
    }

    /// Runs the selection algorithm alone, with no delay accounting —
    /// what a voluntary kernel call does after mutating task state. Also
    /// how tests perform the very first selection `start` would
    /// otherwise make, without diverging into `start`'s infinite idle
    /// loop on `ports::mok`.
    pub fn schedule() {
        unsafe {
            select_next_task();
        }
    }

    /// Returns the name of whichever task is currently selected, or
    /// `None` before the first selection has run.
    pub fn current_task_name() -> Option<TaskName> {
        unsafe {
            if CURRENT.is_null() {
                None
            } else {
                Some((*CURRENT).name)
            }
        }
    }

    /// Returns a task's current status, or `None` if `name` is unknown.
    pub fn task_status(name: &str) -> Option<TaskStatus> {
        let name = TaskName::new(name);
        unsafe {
            let t = find(name);
            if t.is_null() { None } else { Some((*t).status) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use sequential_test::sequential;

    fn setup() {
        Kernel::init();
    }

    fn noop_task() -> ! {
        loop {}
    }

    unsafe fn status_of(name: &str) -> TaskStatus {
        let t = Kernel::get_task_by_name(name).expect("task must exist");
        (*t).status
    }

    #[test]
    #[sequential]
    fn init_creates_a_ready_idle_task() {
        setup();
        assert_eq!(Kernel::get_task_priority("idle"), IDLE_TASK_PRIORITY as i16);
        unsafe {
            assert_eq!(status_of("idle"), TaskStatus::Ready);
        }
    }

    #[test]
    #[sequential]
    fn create_task_rejects_duplicate_names() {
        setup();
        assert!(Kernel::create_task("worker", 5, noop_task).is_some());
        assert!(Kernel::create_task("worker", 5, noop_task).is_none());
    }

    #[test]
    #[sequential]
    fn unknown_name_lookups_return_sentinels() {
        setup();
        assert_eq!(Kernel::get_task_priority("ghost"), -1);
        assert!(Kernel::get_task_by_name("ghost").is_none());
    }

    #[test]
    #[sequential]
    fn priority_dominance_picks_the_smaller_value() {
        setup();
        Kernel::create_task("lo", 200, noop_task).unwrap();
        Kernel::create_task("hi", 1, noop_task).unwrap();
        unsafe {
            select_next_task();
            assert_eq!((*CURRENT).name(), &TaskName::new("hi"));
        }
    }

    #[test]
    #[sequential]
    fn round_robin_cycles_equal_priority_tasks() {
        setup();
        // Creation prepends, so creating in reverse leaves the list (and
        // therefore the round-robin scan order) reading a, b, c.
        Kernel::create_task("c", 5, noop_task).unwrap();
        Kernel::create_task("b", 5, noop_task).unwrap();
        Kernel::create_task("a", 5, noop_task).unwrap();

        // `alloc`-free fixed array collecting the six picks, to avoid
        // pulling in `alloc` just for this test.
        let mut order = [TaskName::new(""); 6];
        for slot in order.iter_mut() {
            unsafe {
                select_next_task();
                *slot = (*CURRENT).name;
            }
        }
        assert_eq!(
            order,
            [
                TaskName::new("a"),
                TaskName::new("b"),
                TaskName::new("c"),
                TaskName::new("a"),
                TaskName::new("b"),
                TaskName::new("c"),
            ]
        );
    }

    #[test]
    #[sequential]
    fn delay_of_zero_is_a_pure_no_op() {
        setup();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        unsafe {
            select_next_task();
            let before = status_of("solo");
            Kernel::delay_task(0);
            assert_eq!(status_of("solo"), before);
        }
    }

    #[test]
    #[sequential]
    fn delay_monotonicity_holds_the_task_until_the_count_elapses() {
        setup();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        unsafe {
            select_next_task();
            (*CURRENT).delay_units = 3;
            (*CURRENT).status = TaskStatus::Delayed;

            decrement_delays();
            assert_eq!(status_of("solo"), TaskStatus::Delayed);
            decrement_delays();
            assert_eq!(status_of("solo"), TaskStatus::Delayed);
            decrement_delays();
            assert_eq!(status_of("solo"), TaskStatus::Ready);
        }
    }

    #[test]
    #[sequential]
    fn idle_runs_when_every_user_task_is_blocked() {
        setup();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        unsafe {
            (*Kernel::get_task_by_name("solo").unwrap()).status = TaskStatus::Suspended;
            select_next_task();
            assert_eq!((*CURRENT).name(), &TaskName::new("idle"));
        }
    }

    #[test]
    #[sequential]
    fn resume_makes_a_suspended_task_selectable_again() {
        setup();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        unsafe {
            (*Kernel::get_task_by_name("solo").unwrap()).status = TaskStatus::Suspended;
            select_next_task();
            assert_eq!((*CURRENT).name(), &TaskName::new("idle"));

            Kernel::resume_task("solo");
            assert_eq!((*CURRENT).name(), &TaskName::new("solo"));
        }
    }
}
