//! State-machine scenarios from the scheduler's testable-properties list,
//! driven through [`artos::Kernel`]'s public simulation facade
//! (`step_tick`/`schedule`) against the host `ports::mok` port rather
//! than real preemption, which this process can't exercise.

#[cfg(test)]
mod kernel_tests {
    use artos::{Kernel, TaskName, TaskStatus};
    use sequential_test::sequential;

    fn noop_task() -> ! {
        loop {}
    }

    #[test]
    #[sequential]
    fn higher_priority_task_runs_first() {
        Kernel::init();
        Kernel::create_task("low", 200, noop_task).unwrap();
        Kernel::create_task("high", 1, noop_task).unwrap();
        Kernel::create_task("mid", 50, noop_task).unwrap();

        Kernel::schedule();
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("high")));
    }

    #[test]
    #[sequential]
    fn equal_priority_tasks_round_robin() {
        Kernel::init();
        // Creation prepends, so creating in reverse leaves the list (and
        // therefore the round-robin scan order) reading a, b, c.
        Kernel::create_task("c", 10, noop_task).unwrap();
        Kernel::create_task("b", 10, noop_task).unwrap();
        Kernel::create_task("a", 10, noop_task).unwrap();

        let mut seen = Vec::new();
        for _ in 0..6 {
            Kernel::schedule();
            seen.push(Kernel::current_task_name().unwrap());
        }

        assert_eq!(
            seen,
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
    fn suspended_task_is_skipped_until_resumed() {
        Kernel::init();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        Kernel::schedule();
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("solo")));

        Kernel::suspend_task();
        assert_eq!(Kernel::task_status("solo"), Some(TaskStatus::Suspended));
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("idle")));

        Kernel::resume_task("solo");
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("solo")));
    }

    #[test]
    #[sequential]
    fn zero_unit_delay_is_a_no_op() {
        Kernel::init();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        Kernel::schedule();
        let before = Kernel::task_status("solo");

        Kernel::delay_task(0);

        assert_eq!(Kernel::task_status("solo"), before);
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("solo")));
    }

    #[test]
    #[sequential]
    fn delayed_task_becomes_ready_after_its_ticks_elapse() {
        Kernel::init();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        Kernel::schedule();

        Kernel::delay_task(2);
        assert_eq!(Kernel::task_status("solo"), Some(TaskStatus::Delayed));
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("idle")));

        Kernel::step_tick();
        assert_eq!(Kernel::task_status("solo"), Some(TaskStatus::Delayed));

        // The second tick both clears the delay and, since "solo" now
        // outranks the idle task, selects it in the same step.
        Kernel::step_tick();
        assert_eq!(Kernel::task_status("solo"), Some(TaskStatus::Running));
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("solo")));
    }

    #[test]
    #[sequential]
    fn raising_a_task_s_priority_preempts_immediately() {
        Kernel::init();
        Kernel::create_task("low", 100, noop_task).unwrap();
        Kernel::create_task("high", 1, noop_task).unwrap();
        Kernel::schedule();
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("high")));

        Kernel::set_task_priority("low", 0);
        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("low")));
    }

    #[test]
    #[sequential]
    fn idle_task_runs_when_every_user_task_is_blocked() {
        Kernel::init();
        Kernel::create_task("solo", 5, noop_task).unwrap();
        Kernel::schedule();

        Kernel::suspend_task();

        assert_eq!(Kernel::current_task_name(), Some(TaskName::new("idle")));
        assert_eq!(Kernel::task_status("idle"), Some(TaskStatus::Running));
    }

    #[test]
    #[sequential]
    fn duplicate_task_names_are_rejected() {
        Kernel::init();
        assert!(Kernel::create_task("dup", 5, noop_task).is_some());
        assert!(Kernel::create_task("dup", 5, noop_task).is_none());
    }

    #[test]
    #[sequential]
    fn unknown_task_names_resolve_to_sentinels() {
        Kernel::init();
        assert_eq!(Kernel::get_task_priority("ghost"), -1);
        assert!(Kernel::get_task_by_name("ghost").is_none());
        assert_eq!(Kernel::task_status("ghost"), None);
    }
}
