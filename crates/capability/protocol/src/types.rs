//! 快照寄存器布局与解码

use crate::error::ProtocolError;
use domain::{Indicator, Snapshot};

/// 一次连续读取的保持寄存器块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBlock {
    /// 起始地址
    pub start: u16,
    /// 寄存器数量
    pub count: u16,
}

/// 快照寄存器：4466 起共 24 个，按 8 个一块分三次读取。
pub const SNAPSHOT_BLOCKS: [RegisterBlock; 3] = [
    RegisterBlock { start: 4466, count: 8 },
    RegisterBlock { start: 4474, count: 8 },
    RegisterBlock { start: 4482, count: 8 },
];

/// 解码快照至少需要的寄存器数量（17 个通道，其后为保留位）。
pub const SNAPSHOT_CHANNEL_COUNT: usize = 17;

/// 寄存器偏移（相对 4466）
mod offset {
    pub const REACTOR_TEMP: usize = 0;
    pub const SEPARATOR_TEMP: usize = 1;
    pub const FURNACE_TEMP: usize = 2;
    pub const CONDENSER_TEMP: usize = 3;
    pub const ATM_TEMP: usize = 4;
    pub const REACTOR_PRESSURE: usize = 5;
    pub const GAS_TANK_PRESSURE: usize = 6;
    pub const PROCESS_START_TIME: usize = 7;
    pub const TIME_OF_REACTION: usize = 8;
    pub const PROCESS_END_TIME: usize = 9;
    pub const COOLING_END_TIME: usize = 10;
    pub const NITROGEN_PURGING: usize = 11;
    pub const CARBON_DOOR_STATUS: usize = 12;
    pub const CO_CH4_LEAKAGE: usize = 13;
    pub const JAALI_BLOCKAGE: usize = 14;
    pub const MACHINE_MAINTENANCE: usize = 15;
    pub const AUTO_SHUT_DOWN: usize = 16;
}

/// 指示量极性：原始值如何映射为报警
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// 0 为报警（运行指示：0 表示未就绪）
    AlarmOnZero,
    /// 非 0 为报警（安全指示）
    AlarmOnNonZero,
}

impl Polarity {
    pub fn indicator(self, raw: u16) -> Indicator {
        let alarm = match self {
            Self::AlarmOnZero => raw == 0,
            Self::AlarmOnNonZero => raw != 0,
        };
        if alarm {
            Indicator::Alarm
        } else {
            Indicator::Nominal
        }
    }
}

/// 将寄存器值解码为快照。
///
/// 温度为有符号 16 位，压力与工艺计时为无符号 16 位原值。
pub fn decode_snapshot(
    id: u32,
    registers: &[u16],
    captured_at_ms: i64,
) -> Result<Snapshot, ProtocolError> {
    if registers.len() < SNAPSHOT_CHANNEL_COUNT {
        return Err(ProtocolError::DataParse(format!(
            "need {} registers, got {}",
            SNAPSHOT_CHANNEL_COUNT,
            registers.len()
        )));
    }

    let signed = |index: usize| registers[index] as i16 as f64;
    let unsigned = |index: usize| registers[index] as f64;
    let timer = |index: usize| u32::from(registers[index]);
    let operational = |index: usize| Polarity::AlarmOnZero.indicator(registers[index]);
    let safety = |index: usize| Polarity::AlarmOnNonZero.indicator(registers[index]);

    Ok(Snapshot {
        id,
        reactor_temp: signed(offset::REACTOR_TEMP),
        separator_temp: signed(offset::SEPARATOR_TEMP),
        furnace_temp: signed(offset::FURNACE_TEMP),
        condenser_temp: signed(offset::CONDENSER_TEMP),
        atm_temp: signed(offset::ATM_TEMP),
        reactor_pressure: unsigned(offset::REACTOR_PRESSURE),
        gas_tank_pressure: unsigned(offset::GAS_TANK_PRESSURE),
        process_start_time: timer(offset::PROCESS_START_TIME),
        time_of_reaction: timer(offset::TIME_OF_REACTION),
        process_end_time: timer(offset::PROCESS_END_TIME),
        cooling_end_time: timer(offset::COOLING_END_TIME),
        nitrogen_purging: operational(offset::NITROGEN_PURGING),
        carbon_door_status: operational(offset::CARBON_DOOR_STATUS),
        co_ch4_leakage: safety(offset::CO_CH4_LEAKAGE),
        jaali_blockage: safety(offset::JAALI_BLOCKAGE),
        machine_maintenance: safety(offset::MACHINE_MAINTENANCE),
        auto_shut_down: safety(offset::AUTO_SHUT_DOWN),
        captured_at_ms,
    })
}

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
