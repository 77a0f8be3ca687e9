pub mod threaded {
    //! 线程化场景：默认的 [`ThreadDeliveryExecutor`](tempo_core::ThreadDeliveryExecutor) 下，投递发生在独立线程，
    //! 测试线程只负责推进虚拟时间并以有界的真实等待读取结果。
    //!
    //! # 风险提示（Trade-offs）
    //! - “未触发”的断言依赖一个较短的真实等待窗口；窗口内若出现陈旧投递会被捕获，窗口之后的投递
    //!   由周期号检查兜底，不影响其他断言。

    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use tempo_core::{MockClock, VirtualClock};

    const PATIENCE: Duration = Duration::from_secs(5);
    const QUIET: Duration = Duration::from_millis(50);

    /// 默认执行器下的端到端触发。
    #[test]
    fn thread_delivery_fires_after_advance() {
        let clock = MockClock::new();
        let timer = clock.new_timer();
        let channel = timer.channel();
        let start = clock.now();

        timer.reset(Duration::from_millis(10));
        clock.advance(Duration::from_millis(10));

        let fired = channel.recv_timeout(PATIENCE).expect("投递线程应完成触发");
        assert!(fired >= start + Duration::from_millis(10));
        assert!(!timer.is_active());
    }

    /// 目标之前停止，之后推进时间也不会触发。
    #[test]
    fn thread_delivery_respects_stop() {
        let clock = MockClock::new();
        let timer = clock.new_timer();
        let channel = timer.channel();

        timer.reset(Duration::from_millis(10));
        assert!(timer.stop());
        clock.advance(Duration::from_millis(20));

        assert_eq!(channel.recv_timeout(QUIET), None);
    }

    /// 多线程并发重置/停止后，定时器仍只存在一个有效周期：最后一次装填恰好触发一次。
    #[test]
    fn concurrent_resets_leave_single_live_cycle() {
        let clock = MockClock::new();
        let timer = Arc::new(clock.new_timer());
        let channel = timer.channel();
        let barrier = Arc::new(Barrier::new(4));

        let workers: Vec<_> = (0..4u64)
            .map(|worker| {
                let timer = Arc::clone(&timer);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for round in 0..50u64 {
                        if (worker + round) % 3 == 0 {
                            timer.stop();
                        } else {
                            timer.reset(Duration::from_secs(60 + round));
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("工作线程不应 panic");
        }

        timer.reset(Duration::from_millis(5));
        clock.advance(Duration::from_millis(5));
        assert!(channel.recv_timeout(PATIENCE).is_some(), "最终周期必须触发");
        assert!(!timer.is_active());

        clock.advance(Duration::from_secs(120));
        assert_eq!(channel.recv_timeout(QUIET), None, "被替换的周期不得触发");
    }

    /// 虚拟时间推进与重置在不同线程上竞速：每轮要么先触发、要么被重置替换，绝不会两者兼得。
    #[test]
    fn advance_racing_reset_never_double_fires() {
        for _ in 0..20 {
            let clock = MockClock::new();
            let timer = Arc::new(clock.new_timer());
            let channel = timer.channel();
            timer.reset(Duration::from_millis(10));

            let racer = {
                let timer = Arc::clone(&timer);
                thread::spawn(move || timer.reset(Duration::from_secs(3600)))
            };
            clock.advance(Duration::from_millis(10));
            let was_active = racer.join().expect("重置线程不应 panic");

            // 重置线程看到 `active == false` 说明旧周期已经失活并投递。
            let fired = channel.recv_timeout(if was_active { QUIET } else { PATIENCE });
            assert_eq!(fired.is_some(), !was_active);
            assert!(timer.is_active(), "新周期目标在一小时之后");
        }
    }
}
