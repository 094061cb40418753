//! 控制台展示：快照文本块与指示灯颜色。
//!
//! 指示量到颜色的映射只在这里发生，核心只区分 Nominal / Alarm。

use domain::{Indicator, Snapshot, TransportState};
use pyro_sync::{SchedulerState, SyncStatus};
use std::fmt::Write;

pub const NO_TELEMETRY: &str = "-- no telemetry --";

pub fn indicator_color(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Nominal => "green",
        Indicator::Alarm => "red",
    }
}

/// 单份快照的文本块。
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== boiler {} @ {} ms ==", snapshot.id, snapshot.captured_at_ms);
    let _ = writeln!(
        out,
        "temp     reactor {:>6.1}  separator {:>6.1}  furnace {:>6.1}  condenser {:>6.1}  atm {:>6.1}",
        snapshot.reactor_temp,
        snapshot.separator_temp,
        snapshot.furnace_temp,
        snapshot.condenser_temp,
        snapshot.atm_temp
    );
    let _ = writeln!(
        out,
        "pressure reactor {:>6.1}  gas tank {:>6.1}",
        snapshot.reactor_pressure, snapshot.gas_tank_pressure
    );
    let _ = writeln!(
        out,
        "timers   start {}  reaction {}  end {}  cooling end {}",
        snapshot.process_start_time,
        snapshot.time_of_reaction,
        snapshot.process_end_time,
        snapshot.cooling_end_time
    );
    let _ = writeln!(out, "process  {}", indicator_row(&snapshot.operational_indicators()));
    let _ = write!(out, "safety   {}", indicator_row(&snapshot.safety_indicators()));
    out
}

fn indicator_row(indicators: &[(&'static str, Indicator)]) -> String {
    indicators
        .iter()
        .map(|(name, indicator)| format!("{}={}", name, indicator_color(*indicator)))
        .collect::<Vec<_>>()
        .join("  ")
}

/// 状态行。
pub fn render_status(status: &SyncStatus, transport: TransportState) -> String {
    let endpoint = status
        .endpoint
        .as_ref()
        .map(|e| format!("{} on {}", e.plant_id, e.com_port))
        .unwrap_or_else(|| "-".to_string());
    let scheduler = match status.scheduler {
        SchedulerState::Idle => "idle",
        SchedulerState::Polling => "polling",
    };
    format!(
        "field link: {:?} ({})  scheduler: {}  transport: {:?}",
        status.field_link, endpoint, scheduler, transport
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{EndpointConfig, LinkState};

    #[test]
    fn alarm_is_red_and_nominal_is_green() {
        assert_eq!(indicator_color(Indicator::Nominal), "green");
        assert_eq!(indicator_color(Indicator::Alarm), "red");
    }

    #[test]
    fn snapshot_block_lists_values_and_colors() {
        let snapshot = Snapshot {
            reactor_temp: 412.5,
            gas_tank_pressure: 3.0,
            cooling_end_time: 90,
            co_ch4_leakage: Indicator::Alarm,
            ..Snapshot::default()
        };
        let text = render_snapshot(&snapshot);
        assert!(text.contains("reactor  412.5"));
        assert!(text.contains("gas tank    3.0"));
        assert!(text.contains("cooling end 90"));
        assert!(text.contains("coCh4Leakage=red"));
        assert!(text.contains("nitrogenPurging=green"));
    }

    #[test]
    fn status_line_shows_endpoint() {
        let status = SyncStatus {
            field_link: LinkState::Connected,
            scheduler: SchedulerState::Polling,
            endpoint: Some(EndpointConfig::new("Plant-7", "COM9")),
            snapshot: None,
        };
        let line = render_status(&status, TransportState::Connecting);
        assert!(line.contains("Plant-7 on COM9"));
        assert!(line.contains("polling"));
        assert!(line.contains("Connecting"));
    }
}
