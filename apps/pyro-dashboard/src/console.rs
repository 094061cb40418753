//! 操作员控制台命令解析。

use domain::EndpointConfig;
use pyro_sync::SyncError;
use tracing::warn;

/// 控制台命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 保存端点：`save <plantId> <comPort>`
    Save { plant_id: String, com_port: String },
    /// 用已保存的端点连接现场链路
    Connect,
    Disconnect,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Usage(&'static str),
    UnterminatedQuote,
    Unknown(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::Usage(usage) => write!(f, "usage: {}", usage),
            ParseError::UnterminatedQuote => write!(f, "unterminated quote"),
            ParseError::Unknown(word) => write!(f, "unknown command: {} (try `help`)", word),
        }
    }
}

pub const HELP: &str = "commands: save <plantId> <comPort> | connect | disconnect | status | help | quit\n\
    (quote values containing spaces; \"\" saves an empty value)";

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "" => Err(ParseError::Empty),
        "save" => match <[String; 2]>::try_from(split_args(rest)?) {
            Ok([plant_id, com_port]) => Ok(Command::Save { plant_id, com_port }),
            Err(_) => Err(ParseError::Usage("save <plantId> <comPort>")),
        },
        "connect" => Ok(Command::Connect),
        "disconnect" => Ok(Command::Disconnect),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

/// 按空白切分参数；双引号包裹的值原样保留，可含空白或为空。
fn split_args(input: &str) -> Result<Vec<String>, ParseError> {
    let mut args = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else { break };

        let mut value = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(ParseError::UnterminatedQuote),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
        }
        args.push(value);
    }
    Ok(args)
}

/// stdin 读取结果；读错误与 EOF 一样结束控制台，让退出流程照常执行。
pub fn next_input(result: std::io::Result<Option<String>>) -> Option<String> {
    match result {
        Ok(line) => line,
        Err(err) => {
            warn!(error = %err, "console input failed");
            None
        }
    }
}

/// connect 的提示语。首轮读取失败时 connect 仍返回成功，此时链路已断开。
pub fn connect_message(
    result: &Result<bool, SyncError>,
    connected: bool,
    endpoint: &EndpointConfig,
) -> String {
    match result {
        Ok(_) if connected => format!(
            "field link open: {} on {}",
            endpoint.plant_id, endpoint.com_port
        ),
        Ok(_) => format!(
            "field link to {} on {} dropped on the first read",
            endpoint.plant_id, endpoint.com_port
        ),
        Err(err) => format!("connect failed: {}", err),
    }
}
