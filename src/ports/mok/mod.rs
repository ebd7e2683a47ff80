//! Host stand-in `Platform`.
//!
//! Every operation here is either a no-op or backed by plain heap-free
//! host memory: real scheduling logic is exercised against it in tests
//! without needing real hardware or real interrupts.
//!
//! There is no real preemption on this port: nothing ever calls the
//! tick timer interrupt, and this port never actually resumes a task's
//! registers — there are none to resume, since task entry points here
//! are plain host functions nothing ever calls. Tests exercise the
//! portable scheduling algorithm in [`crate::kernel`] directly instead
//! of going through an interrupt or a real context switch.

use crate::platform::Platform;
use core::cell::UnsafeCell;

/// Size of the host-side scratch arena `MokPlatform::ram_top` points at
/// the top of. Generous relative to [`crate::arena::TASK_REGION_SIZE`]
/// so tests can create several tasks without tuning this by hand.
const MOK_RAM_SIZE: usize = crate::arena::TASK_REGION_SIZE * 64;

struct MokRam(UnsafeCell<[u8; MOK_RAM_SIZE]>);

// SAFETY: tests that touch this run serialized behind `sequential-test`.
unsafe impl Sync for MokRam {}

static MOK_RAM: MokRam = MokRam(UnsafeCell::new([0u8; MOK_RAM_SIZE]));

/// `Platform` implementation backing tests and any non-AVR host build.
pub struct MokPlatform;

impl Platform for MokPlatform {
    unsafe fn disable_interrupts() {}

    unsafe fn enable_interrupts() {}

    fn sleep_until_interrupt() {}

    fn configure_tick_timer() {}

    fn enable_tick_interrupt() {}

    fn ram_top() -> *mut u8 {
        unsafe { (*MOK_RAM.0.get()).as_mut_ptr().add(MOK_RAM_SIZE) }
    }
}
