//! Modbus ASCII 帧编解码与客户端
//!
//! 帧格式：`:` + 十六进制(从站, 功能码, 数据.., LRC) + `\r\n`。
//! LRC 为前面所有字节 8 位累加和的补码。

use crate::device::FieldDevice;
use crate::error::ProtocolError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// 读保持寄存器 (0x03)
pub const READ_HOLDING_REGISTERS: u8 = 0x03;

const EXCEPTION_FLAG: u8 = 0x80;

/// 纵向冗余校验
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
        .wrapping_neg()
}

/// 将 ADU（不含 LRC）编码为 ASCII 帧
pub fn encode_frame(adu: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(adu.len() + 1);
    raw.extend_from_slice(adu);
    raw.push(lrc(adu));

    let mut frame = Vec::with_capacity(raw.len() * 2 + 3);
    frame.push(b':');
    frame.extend_from_slice(hex::encode_upper(&raw).as_bytes());
    frame.extend_from_slice(b"\r\n");
    frame
}

/// 读保持寄存器请求帧
pub fn read_holding_request(slave_id: u8, start: u16, count: u16) -> Vec<u8> {
    let [start_hi, start_lo] = start.to_be_bytes();
    let [count_hi, count_lo] = count.to_be_bytes();
    encode_frame(&[
        slave_id,
        READ_HOLDING_REGISTERS,
        start_hi,
        start_lo,
        count_hi,
        count_lo,
    ])
}

/// 解析 ASCII 帧，校验 LRC，返回不含 LRC 的 ADU
pub fn decode_frame(frame: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let start = frame
        .iter()
        .position(|byte| *byte == b':')
        .ok_or_else(|| ProtocolError::Frame("missing start character".to_string()))?;
    let body = frame[start + 1..]
        .strip_suffix(b"\r\n")
        .or_else(|| frame[start + 1..].strip_suffix(b"\n"))
        .ok_or_else(|| ProtocolError::Frame("missing frame terminator".to_string()))?;

    let bytes = hex::decode(body).map_err(|e| ProtocolError::Frame(format!("hex: {}", e)))?;
    let Some((checksum, adu)) = bytes.split_last() else {
        return Err(ProtocolError::Frame("empty frame".to_string()));
    };
    if adu.len() < 2 {
        return Err(ProtocolError::Frame(format!("frame too short: {} bytes", bytes.len())));
    }
    let expected = lrc(adu);
    if *checksum != expected {
        return Err(ProtocolError::Frame(format!(
            "lrc mismatch: got {:#04x}, expected {:#04x}",
            checksum, expected
        )));
    }
    Ok(adu.to_vec())
}

/// 解析读寄存器应答 ADU
pub fn parse_read_response(
    adu: &[u8],
    slave_id: u8,
    function: u8,
    count: u16,
) -> Result<Vec<u16>, ProtocolError> {
    if adu.len() < 2 {
        return Err(ProtocolError::Frame("response too short".to_string()));
    }
    if adu[0] != slave_id {
        return Err(ProtocolError::Frame(format!(
            "unexpected slave id {}, expected {}",
            adu[0], slave_id
        )));
    }
    if adu[1] == function | EXCEPTION_FLAG {
        let code = adu.get(2).copied().unwrap_or_default();
        return Err(ProtocolError::Exception(code));
    }
    if adu[1] != function {
        return Err(ProtocolError::Frame(format!(
            "unexpected function code {:#04x}",
            adu[1]
        )));
    }

    let expected_bytes = count as usize * 2;
    let byte_count = adu.get(2).copied().unwrap_or_default() as usize;
    let data = &adu[3.min(adu.len())..];
    if byte_count != expected_bytes || data.len() != expected_bytes {
        return Err(ProtocolError::DataParse(format!(
            "expected {} data bytes, got byte count {} with {} bytes",
            expected_bytes,
            byte_count,
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Modbus ASCII 客户端（任意异步字节流之上）
pub struct AsciiClient<S> {
    stream: BufReader<S>,
    slave_id: u8,
    timeout: Duration,
}

impl<S> AsciiClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, slave_id: u8, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            slave_id,
            timeout,
        }
    }

    /// 发送一帧请求并等待一帧应答
    async fn transact(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        self.stream.write_all(request).await?;
        self.stream.flush().await?;

        let mut line = Vec::new();
        let read = tokio::time::timeout(self.timeout, self.stream.read_until(b'\n', &mut line))
            .await
            .map_err(|_| {
                ProtocolError::Timeout(format!("no response within {}ms", self.timeout.as_millis()))
            })??;
        if read == 0 {
            return Err(ProtocolError::Connection("stream closed".to_string()));
        }
        decode_frame(&line)
    }
}

#[async_trait]
impl<S> FieldDevice for AsciiClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        let request = read_holding_request(self.slave_id, start, count);
        let adu = self.transact(&request).await?;
        let registers = parse_read_response(&adu, self.slave_id, READ_HOLDING_REGISTERS, count)?;
        debug!(
            target: "pyro.field",
            slave = self.slave_id,
            register = start,
            count = count,
            values = ?registers,
            "read modbus ascii registers"
        );
        Ok(registers)
    }
}
