use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// 定时器的单槽触发通道（接收端句柄）。
///
/// # 设计背景（Why）
/// - 每个触发周期最多产生一次触发事件；迟到的消费者仍应能读到最近一次未被取走的触发；
/// - 投递任务绝不能因消费者缺席而阻塞，否则会拖住门闩，进而阻塞后续的 `reset`/`stop`。
///
/// # 逻辑解析（How）
/// - 槽位是 `Mutex<Option<Instant>>`，配合 `Condvar` 服务阻塞式读取、配合 `Waker` 服务异步读取；
/// - 生产端 [`FiringChannel::offer`] 在槽位已被占用时直接丢弃新值并返回 `false`。
///
/// # 契约说明（What）
/// - 句柄可任意克隆，所有克隆共享同一槽位，同一事件只会被其中一个读取者取走；
/// - 读取操作不会修改定时器状态；
/// - 异步读取同一时刻只跟踪最近一次登记的 waker，多个并发的异步读取者应各自持有独立定时器。
#[derive(Clone, Debug, Default)]
pub struct FiringChannel {
    inner: Arc<SlotInner>,
}

#[derive(Debug, Default)]
struct SlotInner {
    slot: Mutex<SlotState>,
    filled: Condvar,
}

#[derive(Debug, Default)]
struct SlotState {
    value: Option<Instant>,
    waker: Option<Waker>,
}

impl FiringChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 非阻塞投递；槽位已有未读事件时丢弃本次事件。
    pub(crate) fn offer(&self, at: Instant) -> bool {
        let mut slot = self.inner.slot.lock();
        if slot.value.is_some() {
            trace!(?at, "firing slot occupied, event skipped");
            return false;
        }
        slot.value = Some(at);
        let waker = slot.waker.take();
        drop(slot);

        self.inner.filled.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    /// 取走槽位中的事件（若有）。
    pub fn try_recv(&self) -> Option<Instant> {
        self.inner.slot.lock().value.take()
    }

    /// 槽位当前是否为空。
    pub fn is_empty(&self) -> bool {
        self.inner.slot.lock().value.is_none()
    }

    /// 异步等待下一次触发。
    ///
    /// 若定时器从未被触发，返回的 Future 将一直保持 Pending。
    pub fn recv(&self) -> Recv<'_> {
        Recv { channel: self }
    }

    /// 以真实时间为上限阻塞等待触发事件。
    ///
    /// 这是为线程化投递准备的测试辅助：虚拟时间由测试推进，而投递发生在另一个线程上，
    /// 读取方需要一个有界的真实等待以免测试挂死。超时返回 `None`。
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Instant> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.inner.slot.lock();
        loop {
            if let Some(at) = slot.value.take() {
                return Some(at);
            }
            if self.inner.filled.wait_until(&mut slot, deadline).timed_out() {
                return slot.value.take();
            }
        }
    }
}

/// [`FiringChannel::recv`] 返回的 Future。
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Recv<'a> {
    channel: &'a FiringChannel,
}

impl Future for Recv<'_> {
    type Output = Instant;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.channel.inner.slot.lock();
        match slot.value.take() {
            Some(at) => Poll::Ready(at),
            None => {
                if !slot
                    .waker
                    .as_ref()
                    .is_some_and(|existing| existing.will_wake(cx.waker()))
                {
                    slot.waker = Some(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
