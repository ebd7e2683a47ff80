//! The seam between portable scheduling logic and a concrete target.
//!
//! [`crate::kernel`] never mentions AVR registers, timer peripherals, or
//! `sleep` instructions directly; it only calls through the [`Platform`]
//! trait. `ports::avr` implements it against real ATmega328P hardware,
//! `ports::mok` implements it as a set of no-op stand-ins so the
//! scheduling logic can be exercised on the host, the same split
//! `ports::mok` draws for the task manager it was modeled on.
//!
//! Notably absent: anything that performs an actual context switch.
//! That half is inherently not portable — it either really swaps a
//! register file (`ports::avr`) or there is nothing to swap (`ports::mok`
//! runs no task bodies at all) — so it is never reached through this
//! trait. It lives directly in each port and is invoked from
//! [`crate::kernel`] through a small `cfg_if!`-selected free function
//! instead; see `kernel::dispatch_first`.
pub trait Platform {
    /// Globally disables interrupts. Idempotent.
    ///
    /// # Safety
    ///
    /// Only ever called from inside the kernel's own critical sections,
    /// which are responsible for re-enabling interrupts before control
    /// leaves them.
    unsafe fn disable_interrupts();

    /// Globally re-enables interrupts. Idempotent.
    ///
    /// # Safety
    ///
    /// Same caller contract as [`disable_interrupts`](Platform::disable_interrupts).
    unsafe fn enable_interrupts();

    /// Puts the CPU to sleep until the next interrupt, then returns.
    /// Used by the idle task body.
    fn sleep_until_interrupt();

    /// Configures the periodic tick timer for a 1 ms period, without
    /// unmasking its interrupt yet.
    fn configure_tick_timer();

    /// Unmasks the tick timer's interrupt. Called once, from
    /// [`crate::kernel::Kernel::start`], after the task list is
    /// populated and the idle task exists.
    fn enable_tick_interrupt();

    /// Returns one past the highest address of the region the kernel is
    /// allowed to carve task regions and the scheduler scratch stack
    /// from.
    fn ram_top() -> *mut u8;
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "avr")] {
        pub use crate::ports::avr::AvrPlatform as ActivePlatform;
    } else {
        pub use crate::ports::mok::MokPlatform as ActivePlatform;
    }
}
