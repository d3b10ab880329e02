use domain::Timestamp;

/// 时间来源抽象，限流窗口的测试依赖手动推进时间。
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Unix 毫秒时间戳，限流记录内部使用。
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}
