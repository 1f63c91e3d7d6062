use time::OffsetDateTime;

/// 現在時刻の取得元
///
/// テストでは時刻を進められる実装に差し替える
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// システム時刻（UTC）
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
