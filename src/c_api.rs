//! `extern "C"` wrappers over [`crate::kernel::Kernel`], named after
//! `original_source/inc/rtos.h`'s `SimpleRTOS_*` declarations. A thin,
//! allocation-free pass-through layer with no logic of its own.
//!
//! Task names cross the boundary as `*const c_char`; entry points cross
//! it as plain `extern "C" fn() -> !`, which is ABI-compatible with the
//! `Rust fn() -> !` [`crate::task::TaskEntry`] this crate uses internally
//! on this target.

use crate::kernel::Kernel;
use crate::task::Tcb;
use core::ffi::{c_char, c_int};

/// Reads a NUL-terminated C string into a `&str`, lossily if it is not
/// valid UTF-8.
///
/// # Safety
///
/// `name` must point at a NUL-terminated byte sequence valid for reads.
unsafe fn str_from_c(name: *const c_char) -> &'static str {
    let cstr = core::ffi::CStr::from_ptr(name);
    core::str::from_utf8(cstr.to_bytes()).unwrap_or("")
}

#[unsafe(no_mangle)]
pub extern "C" fn simple_rtos_init() {
    Kernel::init();
}

#[unsafe(no_mangle)]
pub extern "C" fn simple_rtos_start() -> ! {
    Kernel::start()
}

/// # Safety
///
/// `task_name` must point at a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn simple_rtos_create_task(
    task_name: *const c_char,
    task_priority: u8,
    task_function_ptr: extern "C" fn() -> !,
) -> *mut Tcb {
    let name = unsafe { str_from_c(task_name) };
    // `build_initial_frame` only ever reads this pointer's numeric
    // address; it is jumped to via the restored task's `reti`, never
    // called through either ABI, so the two function-pointer types are
    // interchangeable here.
    let entry = unsafe { core::mem::transmute::<extern "C" fn() -> !, crate::task::TaskEntry>(task_function_ptr) };
    Kernel::create_task(name, task_priority as u16, entry).unwrap_or(core::ptr::null_mut())
}

/// # Safety
///
/// `task_name` must point at a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn simple_rtos_set_task_priority(
    task_name: *const c_char,
    new_task_priority: u8,
) {
    let name = unsafe { str_from_c(task_name) };
    Kernel::set_task_priority(name, new_task_priority as u16);
}

/// # Safety
///
/// `task_name` must point at a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn simple_rtos_get_task_priority(task_name: *const c_char) -> c_int {
    let name = unsafe { str_from_c(task_name) };
    Kernel::get_task_priority(name) as c_int
}

#[unsafe(no_mangle)]
pub extern "C" fn simple_rtos_suspend_task() {
    Kernel::suspend_task();
}

/// # Safety
///
/// `task_name` must point at a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn simple_rtos_resume_task(task_name: *const c_char) {
    let name = unsafe { str_from_c(task_name) };
    Kernel::resume_task(name);
}

#[unsafe(no_mangle)]
pub extern "C" fn simple_rtos_delay_task(delay_time_units: u16) {
    Kernel::delay_task(delay_time_units);
}

/// # Safety
///
/// `task_name` must point at a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn simple_rtos_get_task_by_name(task_name: *const c_char) -> *mut Tcb {
    let name = unsafe { str_from_c(task_name) };
    Kernel::get_task_by_name(name).unwrap_or(core::ptr::null_mut())
}
