//! Zone metrics
//!
//! Counters and tick timing of one zone, rendered in Prometheus text format
//! or as JSON for whoever wants to expose them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

const TICK_HISTORY: usize = 1000;

#[derive(Debug)]
pub struct ZoneMetrics {
    // Population
    pub ai_count: AtomicU64,
    pub group_count: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    /// AI updates performed over all ticks
    pub ai_updates: AtomicU64,

    // Applied schedules
    pub ais_added: AtomicU64,
    pub ais_removed: AtomicU64,
    pub ais_destroyed: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl ZoneMetrics {
    pub fn new() -> Self {
        Self {
            ai_count: AtomicU64::new(0),
            group_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            ai_updates: AtomicU64::new(0),
            ais_added: AtomicU64::new(0),
            ais_removed: AtomicU64::new(0),
            ais_destroyed: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us
                .store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Prometheus text format, every sample labelled with the zone name
    pub fn to_prometheus(&self, zone: &str) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{}{{zone=\"{}\"}} {}\n",
                    $name, $help, $name, $type, $name, zone, $value
                ));
            };
        }

        metric!("simpleai_zone_ais", "AIs in the zone", "gauge",
            self.ai_count.load(Ordering::Relaxed));
        metric!("simpleai_zone_groups", "Groups in the zone", "gauge",
            self.group_count.load(Ordering::Relaxed));

        metric!("simpleai_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("simpleai_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("simpleai_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("simpleai_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("simpleai_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("simpleai_ai_updates_total", "Total AI updates", "counter",
            self.ai_updates.load(Ordering::Relaxed));

        metric!("simpleai_ais_added_total", "AIs added by scheduled adds", "counter",
            self.ais_added.load(Ordering::Relaxed));
        metric!("simpleai_ais_removed_total", "AIs removed by scheduled removes", "counter",
            self.ais_removed.load(Ordering::Relaxed));
        metric!("simpleai_ais_destroyed_total", "AIs removed by scheduled destroys", "counter",
            self.ais_destroyed.load(Ordering::Relaxed));
        metric!("simpleai_uptime_seconds", "Zone uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "population": {
                "ais": self.ai_count.load(Ordering::Relaxed),
                "groups": self.group_count.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
                "ai_updates": self.ai_updates.load(Ordering::Relaxed),
            },
            "schedules": {
                "added": self.ais_added.load(Ordering::Relaxed),
                "removed": self.ais_removed.load(Ordering::Relaxed),
                "destroyed": self.ais_destroyed.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
    }
}

impl Default for ZoneMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = ZoneMetrics::new();
        assert_eq!(metrics.ai_count.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_tick_time() {
        let metrics = ZoneMetrics::new();
        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert!(metrics.tick_time_p95_us.load(Ordering::Relaxed) > 0);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = ZoneMetrics::new();
        metrics.ai_count.store(50, Ordering::Relaxed);

        let output = metrics.to_prometheus("forest");
        assert!(output.contains("simpleai_zone_ais{zone=\"forest\"} 50"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE simpleai_tick_count counter"));
    }

    #[test]
    fn test_json_format() {
        let metrics = ZoneMetrics::new();
        metrics.ais_added.store(3, Ordering::Relaxed);

        let json = metrics.to_json();
        assert_eq!(json["schedules"]["added"], 3);
        assert_eq!(json["population"]["ais"], 0);
    }
}
