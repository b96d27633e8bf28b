//! Fixed-interval acquisition loop.
//!
//! Every tick the [`Poller`] queries Ch1, Ch2 and Ch3 in that order and hands
//! each reading to a [`MeasurementSink`]. A pass that overruns the period is
//! followed by at most one immediate tick; further missed ticks are skipped,
//! so slow I/O never turns into a catch-up burst.
//!
//! Any error ends the loop and is returned to the caller. There is no retry.

use crate::adapters::Adapter;
use crate::channel::PHYSICAL_CHANNELS;
use crate::error::{AppResult, DaqError};
use crate::instrument::Dp832;
use crate::measurement::MeasurementSink;
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Drives repeated measurement passes over a verified DP832.
pub struct Poller<A> {
    psu: Dp832<A>,
    period: Duration,
}

impl<A: Adapter> Poller<A> {
    /// Poll `psu` every `period`.
    ///
    /// # Errors
    /// `DaqError::Configuration` if `period` is zero.
    pub fn new(psu: Dp832<A>, period: Duration) -> AppResult<Self> {
        if period.is_zero() {
            return Err(DaqError::Configuration(
                "poll period must be > 0".to_string(),
            ));
        }
        Ok(Self { psu, period })
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Poll until something fails.
    ///
    /// Only ever returns the error that stopped the loop.
    pub async fn run<S>(&mut self, sink: &mut S) -> AppResult<Infallible>
    where
        S: MeasurementSink + ?Sized,
    {
        info!(period_ms = self.period.as_millis() as u64, "Starting poll loop");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut pass: u64 = 0;
        loop {
            ticker.tick().await;
            pass += 1;
            self.poll_once(pass, sink).await?;
        }
    }

    /// Poll exactly `passes` full passes, then stop.
    pub async fn run_passes<S>(&mut self, passes: u64, sink: &mut S) -> AppResult<()>
    where
        S: MeasurementSink + ?Sized,
    {
        info!(
            period_ms = self.period.as_millis() as u64,
            passes, "Starting bounded poll loop"
        );
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        for pass in 1..=passes {
            ticker.tick().await;
            self.poll_once(pass, sink).await?;
        }

        info!(passes, "Poll loop finished");
        Ok(())
    }

    /// Give back the instrument.
    pub fn into_instrument(self) -> Dp832<A> {
        self.psu
    }

    async fn poll_once<S>(&mut self, pass: u64, sink: &mut S) -> AppResult<()>
    where
        S: MeasurementSink + ?Sized,
    {
        debug!(pass, "Poll pass");
        for channel in PHYSICAL_CHANNELS {
            let measurement = self.psu.measure(channel).await?;
            sink.record(&measurement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::channel::Channel;
    use crate::instrument::DP832_MODEL;
    use crate::measurement::Measurement;
    use tokio::time::Instant;

    const RIGOL_IDN: &str = "RIGOL TECHNOLOGIES,DP832,DP8A123456789,00.01.02.03";

    async fn poller(mock: MockAdapter) -> Poller<MockAdapter> {
        let psu = Dp832::verify(mock, DP832_MODEL).await.unwrap();
        Poller::new(psu, Duration::from_millis(100)).unwrap()
    }

    fn assert_near(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(2),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn script(passes: usize) -> MockAdapter {
        (0..passes * 3).fold(MockAdapter::new().reply(RIGOL_IDN), |mock, i| {
            mock.reply(format!("0.{},1.0,0.1", i))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_visited_in_order_every_pass() {
        let mut poller = poller(script(3)).await;
        let mut seen: Vec<Channel> = Vec::new();
        let mut sink = |m: &Measurement| -> AppResult<()> {
            seen.push(m.channel);
            Ok(())
        };

        poller.run_passes(3, &mut sink).await.unwrap();

        let expected: Vec<Channel> = (0..3).flat_map(|_| PHYSICAL_CHANNELS).collect();
        assert_eq!(seen, expected);

        let sent = poller.into_instrument().into_adapter().sent().to_vec();
        assert_eq!(sent.len(), 10);
        assert_eq!(sent[0], "*IDN?");
        for pass in sent[1..].chunks(3) {
            assert_eq!(pass, ["MEAS:ALL? CH1", "MEAS:ALL? CH2", "MEAS:ALL? CH3"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_follow_period() {
        let mut poller = poller(script(3)).await;
        let start = Instant::now();
        let mut starts = Vec::new();
        let mut sink = |m: &Measurement| -> AppResult<()> {
            if m.channel == Channel::Ch1 {
                starts.push(start.elapsed());
            }
            Ok(())
        };

        poller.run_passes(3, &mut sink).await.unwrap();

        assert_eq!(starts.len(), 3);
        for (pass, elapsed) in starts.iter().enumerate() {
            assert_near(*elapsed, Duration::from_millis(100 * pass as u64));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_does_not_burst() {
        // First pass stalls 450 ms on Ch1, i.e. four ticks are missed.
        let mock = MockAdapter::new()
            .reply(RIGOL_IDN)
            .reply_after(Duration::from_millis(450), "0.1,1.0,0.1")
            .reply("0.1,1.0,0.1")
            .reply("0.1,1.0,0.1");
        let mock = (0..9).fold(mock, |mock, _| mock.reply("0.1,1.0,0.1"));

        let mut poller = poller(mock).await;
        let start = Instant::now();
        let mut starts = Vec::new();
        let mut sink = |m: &Measurement| -> AppResult<()> {
            if m.channel == Channel::Ch1 {
                starts.push(start.elapsed());
            }
            Ok(())
        };

        poller.run_passes(4, &mut sink).await.unwrap();

        assert_eq!(starts.len(), 4);
        // One late tick fires straight away, the rest are dropped and the
        // schedule realigns to the next period boundary.
        assert_near(starts[1], Duration::from_millis(450));
        assert!(starts[2] >= Duration::from_millis(498), "{:?}", starts);
        assert!(starts[3] - starts[2] >= Duration::from_millis(98), "{:?}", starts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_loop_without_remaining_channels() {
        let mock = MockAdapter::new()
            .reply(RIGOL_IDN)
            .reply("0.1,1.0,0.1")
            .reply("garbage")
            .reply("0.1,1.0,0.1");
        let mut poller = poller(mock).await;
        let mut seen: Vec<Channel> = Vec::new();
        let mut sink = |m: &Measurement| -> AppResult<()> {
            seen.push(m.channel);
            Ok(())
        };

        let err = poller.run(&mut sink).await.unwrap_err();
        assert!(matches!(err, DaqError::Parse(_)));
        assert_eq!(seen, [Channel::Ch1]);

        let adapter = poller.into_instrument().into_adapter();
        assert_eq!(adapter.sent().last().unwrap(), "MEAS:ALL? CH2");
        assert_eq!(adapter.remaining(), 1);
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let psu = Dp832::verify(MockAdapter::new().reply(RIGOL_IDN), DP832_MODEL)
            .await
            .unwrap();
        assert!(matches!(
            Poller::new(psu, Duration::ZERO),
            Err(DaqError::Configuration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_error_is_fatal() {
        let mut poller = poller(script(2)).await;
        let mut sink = |_: &Measurement| -> AppResult<()> { Err(DaqError::ConnectionClosed) };

        let result = poller.run_passes(2, &mut sink).await;
        assert!(matches!(result, Err(DaqError::ConnectionClosed)));
    }
}
