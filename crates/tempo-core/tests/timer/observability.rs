pub mod observability {
    //! 日志事件：装填、停止、触发、陈旧触发丢弃均留下可检索的 `tracing` 事件，方便排查时序问题。
    //!
    //! 投递任务由手动执行器在测试线程内运行，事件落在 `traced_test` 安装的线程局部订阅者中。

    use std::time::Duration;

    use tracing_test::traced_test;

    use crate::support::Rig;

    #[traced_test]
    #[test]
    fn arm_and_fire_are_logged() {
        let rig = Rig::new();
        rig.timer.reset(Duration::from_millis(3));
        rig.advance(Duration::from_millis(3));

        assert!(logs_contain("timer armed"));
        assert!(logs_contain("timer fired"));
    }

    #[traced_test]
    #[test]
    fn stale_firing_is_logged() {
        let rig = Rig::new();
        rig.timer.reset(Duration::from_millis(3));
        rig.settle();
        rig.clock.advance(Duration::from_millis(3));
        rig.timer.stop();
        rig.settle();

        assert!(logs_contain("timer stopped"));
        assert!(logs_contain("stale firing discarded"));
        assert!(!logs_contain("timer fired"));
    }
}
