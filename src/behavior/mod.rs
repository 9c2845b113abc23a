//! Background behaviour tasks that run alongside the conversation loop.
//!
//! Each task only reads the shared [`RuntimeState`](crate::state::RuntimeState)
//! and exits when the shutdown token fires.

pub mod eyes;
pub mod idle_speech;
pub mod status;

pub use eyes::{EyeBehaviorTask, EyeMode};
pub use idle_speech::{IdleSpeechTask, IdleTimer};
pub use status::{StatusIndicatorTask, StatusPattern};

use crate::config::MillisRange;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep for `delay` unless shutdown comes first. Returns `true` on shutdown.
pub(crate) async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => true,
        () = crate::motion::pace(delay) => cancel.is_cancelled(),
    }
}

/// A uniformly sampled pause from `range`.
pub(crate) fn sample_pause(rng: &mut impl Rng, range: MillisRange) -> Duration {
    let ms = if range.min >= range.max {
        range.min
    } else {
        rng.gen_range(range.min..=range.max)
    };
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::seeded_rng;

    #[test]
    fn sampled_pauses_stay_in_range() {
        let mut rng = seeded_rng(Some(1), 0);
        for _ in 0..200 {
            let d = sample_pause(&mut rng, MillisRange::new(800, 1800));
            assert!(d >= Duration::from_millis(800) && d <= Duration::from_millis(1800));
        }
        assert_eq!(
            sample_pause(&mut rng, MillisRange::new(5, 5)),
            Duration::from_millis(5)
        );
    }

    #[tokio::test]
    async fn cancelled_sleep_returns_early() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = std::time::Instant::now();
        assert!(sleep_or_cancel(Duration::from_secs(30), &cancel).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn uncancelled_sleep_completes() {
        let cancel = CancellationToken::new();
        assert!(!sleep_or_cancel(Duration::from_millis(1), &cancel).await);
    }
}
