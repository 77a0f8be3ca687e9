pub mod deterministic {
    //! 确定性场景：所有投递任务由手动执行器驱动，测试精确掌控“虚拟时钟就绪”与“任务运行”之间的窗口。
    //!
    //! # 测试目标（Why）
    //! - 覆盖触发时机、取消、重置以及同一虚拟时刻的触发/重置竞态；
    //! - 每个断言都对应定时器对外承诺的一条行为。

    use std::time::Duration;

    use futures::FutureExt;
    use tempo_core::{Timer, VirtualClock};

    use crate::support::Rig;

    const TEN: Duration = Duration::from_millis(10);
    const FIVE: Duration = Duration::from_millis(5);

    /// 到达目标时间（且不早于）恰好触发一次，时间戳不早于目标。
    #[test]
    fn fires_once_exactly_at_deadline() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        let start = rig.clock.now();

        assert!(!rig.timer.reset(TEN), "首次装填前未激活");
        rig.settle();

        rig.advance(Duration::from_millis(9));
        assert!(channel.is_empty(), "目标之前不得触发");
        assert!(rig.timer.is_active());

        rig.advance(Duration::from_millis(1));
        let fired = channel.try_recv().expect("到达目标应触发");
        assert!(fired >= start + TEN);
        assert!(!rig.timer.is_active(), "触发后自动失活");

        rig.advance(TEN);
        assert!(channel.try_recv().is_none(), "同一周期不会二次触发");
        assert_eq!(rig.executor.live_tasks(), 0);
    }

    /// 时间戳取投递时刻的虚拟时间：一次跨越多个步长推进时，时间戳等于推进后的时间。
    #[test]
    fn firing_carries_current_virtual_time() {
        let rig = Rig::new();
        let start = rig.clock.now();
        rig.timer.reset(FIVE);

        rig.advance(Duration::from_millis(12));
        assert_eq!(
            rig.timer.channel().try_recv(),
            Some(start + Duration::from_millis(12))
        );
    }

    /// 目标之前调用 `stop` 会永久抑制本周期的触发。
    #[test]
    fn stop_before_deadline_suppresses_firing() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        rig.timer.reset(TEN);
        rig.advance(FIVE);

        assert!(rig.timer.stop(), "停止一个激活的周期返回 true");
        assert!(!rig.timer.stop(), "重复停止返回 false");
        rig.advance(Duration::from_secs(1));

        assert!(channel.is_empty());
        assert_eq!(rig.executor.live_tasks(), 0, "被释放的任务已退出");
        assert_eq!(rig.clock.pending_waits(), 0, "虚拟等待已注销");
    }

    /// 典型场景：0 时刻装填 10，推进到 5 后重置 10，旧的绝对目标 10 作废，新目标为 15。
    #[test]
    fn reset_rebases_on_current_time() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        let start = rig.clock.now();

        rig.timer.reset(TEN);
        rig.advance(FIVE);
        assert!(channel.is_empty());

        assert!(rig.timer.reset(TEN), "重置激活中的定时器返回 true");
        rig.advance(FIVE);
        assert!(channel.is_empty(), "旧目标已被替换");

        rig.advance(FIVE);
        assert_eq!(channel.try_recv(), Some(start + Duration::from_millis(15)));
        rig.advance(TEN);
        assert!(channel.is_empty());
    }

    /// 触发后的 `reset` 开启新周期，返回 false，并能再次触发。
    #[test]
    fn reset_after_firing_starts_fresh_cycle() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        rig.timer.reset(FIVE);
        rig.advance(FIVE);
        assert!(channel.try_recv().is_some());

        assert!(!rig.timer.reset(FIVE), "已触发的定时器处于未激活状态");
        rig.advance(FIVE);
        assert!(channel.try_recv().is_some(), "新周期再次触发");
    }

    /// 零时长装填在下一次调度时立即触发。
    #[test]
    fn zero_duration_fires_without_advancing() {
        let rig = Rig::new();
        let start = rig.clock.now();
        rig.timer.reset(Duration::ZERO);
        rig.settle();
        assert_eq!(rig.timer.channel().try_recv(), Some(start));
    }

    /// 同一虚拟时刻：时钟已就绪但投递任务尚未运行时调用 `stop`，停止优先，陈旧触发被丢弃。
    #[test]
    fn stop_wins_exact_tie_with_firing() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        rig.timer.reset(TEN);
        rig.settle();

        rig.clock.advance(TEN);
        assert_eq!(rig.clock.pending_waits(), 0, "虚拟等待已就绪");
        assert!(rig.timer.stop(), "投递任务尚未失活，定时器仍处于激活状态");

        rig.settle();
        assert!(channel.is_empty(), "停止与触发同刻时不得投递");
        assert!(!rig.timer.is_active());
        assert_eq!(rig.executor.live_tasks(), 0);
    }

    /// 同一虚拟时刻：时钟已就绪但投递任务尚未运行时调用 `reset`，新周期优先，只在新目标触发。
    #[test]
    fn reset_wins_exact_tie_with_firing() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        let start = rig.clock.now();
        rig.timer.reset(TEN);
        rig.settle();

        rig.clock.advance(TEN);
        assert!(rig.timer.reset(FIVE), "旧周期尚未失活");
        rig.settle();
        assert!(channel.is_empty(), "旧周期的触发被丢弃");
        assert!(rig.timer.is_active(), "新周期保持激活");

        rig.advance(FIVE);
        assert_eq!(channel.try_recv(), Some(start + Duration::from_millis(15)));
    }

    /// 迟到的读者仍能读到最近一次未取走的触发；槽位已满时后续触发被跳过而不阻塞。
    #[test]
    fn late_reader_sees_first_unread_firing() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        let start = rig.clock.now();

        rig.timer.reset(FIVE);
        rig.advance(FIVE);
        rig.timer.reset(FIVE);
        rig.advance(FIVE);

        assert!(!rig.timer.is_active(), "第二次触发已完成失活");
        assert_eq!(channel.try_recv(), Some(start + FIVE), "保留首个未读事件");
        assert!(channel.try_recv().is_none());
    }

    /// 异步读取在虚拟时间到达后完成。
    #[test]
    fn async_receiver_completes_after_advance() {
        let rig = Rig::new();
        let channel = rig.timer.channel();
        let start = rig.clock.now();
        rig.timer.reset(TEN);

        let mut recv = channel.recv();
        assert!((&mut recv).now_or_never().is_none());
        rig.advance(TEN);
        assert_eq!(recv.now_or_never(), Some(start + TEN));
    }

    /// 通过 `dyn Timer` 使用时行为一致。
    #[test]
    fn trait_object_drives_same_protocol() {
        let rig = Rig::new();
        let timer: &dyn Timer = &rig.timer;
        assert!(!timer.reset(TEN));
        assert!(timer.reset(TEN));
        assert!(timer.stop());
        rig.advance(TEN);
        assert!(timer.channel().is_empty());
    }

    /// 多个定时器共享同一虚拟时钟，互不干扰，按各自目标触发。
    #[test]
    fn timers_sharing_clock_are_independent() {
        let rig = Rig::new();
        let other = rig
            .clock
            .new_timer_with(std::sync::Arc::new(rig.executor.clone()));
        rig.timer.reset(TEN);
        other.reset(FIVE);

        rig.advance(FIVE);
        assert!(rig.timer.channel().is_empty());
        assert!(other.channel().try_recv().is_some());

        other.reset(TEN);
        rig.advance(FIVE);
        assert!(rig.timer.channel().try_recv().is_some());
        assert!(other.channel().is_empty());
        assert!(other.is_active());
    }
}
