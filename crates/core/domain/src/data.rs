use serde::{Deserialize, Serialize};

/// 二值指示量（运行指示、安全指示统一使用）。
///
/// 原始 0/1 与红/绿颜色的换算只发生在设备边界和展示边界。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    #[default]
    Nominal,
    Alarm,
}

impl Indicator {
    pub fn is_alarm(self) -> bool {
        matches!(self, Self::Alarm)
    }
}

/// 一次采集得到的完整仪表快照。
///
/// 只在单个 tick 内存活：采集 → 展示/发布 → 丢弃。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// 锅炉编号
    pub id: u32,

    pub reactor_temp: f64,
    pub separator_temp: f64,
    pub furnace_temp: f64,
    pub condenser_temp: f64,
    pub atm_temp: f64,

    pub reactor_pressure: f64,
    pub gas_tank_pressure: f64,

    pub process_start_time: u32,
    pub time_of_reaction: u32,
    pub process_end_time: u32,
    pub cooling_end_time: u32,

    pub nitrogen_purging: Indicator,
    pub carbon_door_status: Indicator,

    pub co_ch4_leakage: Indicator,
    pub jaali_blockage: Indicator,
    pub machine_maintenance: Indicator,
    pub auto_shut_down: Indicator,

    /// 采集时间戳（毫秒）
    pub captured_at_ms: i64,
}

impl Snapshot {
    /// 运行指示（氮气吹扫、炭门）。
    pub fn operational_indicators(&self) -> [(&'static str, Indicator); 2] {
        [
            ("nitrogenPurging", self.nitrogen_purging),
            ("carbonDoorStatus", self.carbon_door_status),
        ]
    }

    /// 安全指示。
    pub fn safety_indicators(&self) -> [(&'static str, Indicator); 4] {
        [
            ("coCh4Leakage", self.co_ch4_leakage),
            ("jaaliBlockage", self.jaali_blockage),
            ("machineMaintenance", self.machine_maintenance),
            ("autoShutDown", self.auto_shut_down),
        ]
    }

    /// 是否存在任一报警指示。
    pub fn has_alarm(&self) -> bool {
        self.operational_indicators()
            .iter()
            .chain(self.safety_indicators().iter())
            .any(|(_, indicator)| indicator.is_alarm())
    }
}
