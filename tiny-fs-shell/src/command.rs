//! 命令文件的单行解析。
//!
//! 每行一条命令，参数以空格分隔；`B` 的参数是 `B ` 之后的整行内容。
//! 参数个数与取值范围都在这里检查，文件系统只会收到合法的命令。

use std::str::FromStr;

use tiny_fs::{Name, BLOCK_SIZE, MAX_FILE_BLOCKS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `M <disk>`
    Mount(String),
    /// `C <name> <size>`，`size` 为0时创建目录
    Create { name: Name, size: u8 },
    /// `D <name>`
    Delete(Name),
    /// `R <name> <block>`
    Read { name: Name, block: u8 },
    /// `W <name> <block>`
    Write { name: Name, block: u8 },
    /// `B <payload>`
    Buffer(Vec<u8>),
    /// `L`
    List,
    /// `E <name> <size>`
    Resize { name: Name, size: u8 },
    /// `O`
    Defrag,
    /// `Y <name>`
    Cd(Name),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` takes {expected} argument(s), got {got}")]
    Arity {
        command: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid name `{0}`")]
    Name(String),
    #[error("`{value}` is not within {min}..={max}")]
    Range { value: String, min: u8, max: u8 },
    #[error("buffer payload must be 1..=1024 bytes, got {0}")]
    Payload(usize),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        if let Some(payload) = line.strip_prefix("B ") {
            return match payload.len() {
                1..=BLOCK_SIZE => Ok(Self::Buffer(payload.as_bytes().to_vec())),
                len => Err(CommandError::Payload(len)),
            };
        }

        let mut tokens = line.split_whitespace();
        let command = tokens.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = tokens.collect();
        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(CommandError::Arity {
                    command: command.to_owned(),
                    expected,
                    got: args.len(),
                })
            }
        };

        match command {
            "M" => {
                arity(1)?;
                Ok(Self::Mount(args[0].to_owned()))
            }
            "C" => {
                arity(2)?;
                Ok(Self::Create {
                    name: name(args[0])?,
                    size: number(args[1], 0, MAX_FILE_BLOCKS)?,
                })
            }
            "D" => {
                arity(1)?;
                Ok(Self::Delete(name(args[0])?))
            }
            "R" | "W" => {
                arity(2)?;
                let name = name(args[0])?;
                let block = number(args[1], 0, MAX_FILE_BLOCKS - 1)?;
                Ok(if command == "R" {
                    Self::Read { name, block }
                } else {
                    Self::Write { name, block }
                })
            }
            // `B` 后面没有内容
            "B" => Err(CommandError::Payload(0)),
            "L" => {
                arity(0)?;
                Ok(Self::List)
            }
            "E" => {
                arity(2)?;
                Ok(Self::Resize {
                    name: name(args[0])?,
                    size: number(args[1], 1, MAX_FILE_BLOCKS)?,
                })
            }
            "O" => {
                arity(0)?;
                Ok(Self::Defrag)
            }
            "Y" => {
                arity(1)?;
                Ok(Self::Cd(name(args[0])?))
            }
            unknown => Err(CommandError::Unknown(unknown.to_owned())),
        }
    }
}

impl Command {
    /// 除挂载与缓冲区外，其余命令都作用于已挂载的文件系统
    pub fn needs_mount(&self) -> bool {
        !matches!(self, Self::Mount(_) | Self::Buffer(_))
    }
}

fn name(arg: &str) -> Result<Name, CommandError> {
    Name::new(arg).ok_or_else(|| CommandError::Name(arg.to_owned()))
}

fn number(arg: &str, min: u8, max: u8) -> Result<u8, CommandError> {
    arg.parse::<u8>()
        .ok()
        .filter(|value| (min..=max).contains(value))
        .ok_or_else(|| CommandError::Range {
            value: arg.to_owned(),
            min,
            max,
        })
}
