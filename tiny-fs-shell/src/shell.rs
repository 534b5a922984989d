use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use tiny_fs::{Error, Session};

use crate::{BlockFile, Command};

/// 逐条执行命令的外壳，持有会话与当前挂载的磁盘名。
///
/// 列表输出写到 `out`，错误信息写到 `err`；任何错误都不会中断后续命令。
pub struct Shell<O, E> {
    session: Session,
    disk: Option<String>,
    out: O,
    err: E,
}

impl<O: Write, E: Write> Shell<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            session: Session::new(),
            disk: None,
            out,
            err,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 当前挂载的磁盘
    pub fn disk(&self) -> Option<&str> {
        self.disk.as_deref()
    }

    pub fn into_output(self) -> (O, E) {
        (self.out, self.err)
    }

    /// 执行命令文件，格式错误的行报告 `Command Error: <file>, <line>` 后跳过。
    pub fn run_script(&mut self, path: &Path) -> io::Result<()> {
        let reader = BufReader::new(File::open(path)?);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => self.execute(command)?,
                Err(err) => {
                    log::debug!("{}:{}: {err}", path.display(), index + 1);
                    writeln!(self.err, "Command Error: {}, {}", path.display(), index + 1)?;
                }
            }
        }
        Ok(())
    }

    /// 执行一条已校验的命令
    pub fn execute(&mut self, command: Command) -> io::Result<()> {
        log::trace!("{command:?}");
        let disk = match &command {
            Command::Mount(disk) => disk.clone(),
            _ => self.disk.clone().unwrap_or_default(),
        };

        if command.needs_mount() && !self.session.is_mounted() {
            return self.report(&Error::NotMounted, &disk);
        }

        let result = match command {
            Command::Mount(disk) => return self.mount(disk),
            Command::Create { name, size } => self.session.create(name, size),
            Command::Delete(name) => self.session.delete(name),
            Command::Read { name, block } => self.session.read(name, block),
            Command::Write { name, block } => self.session.write(name, block),
            Command::Buffer(payload) => self.session.set_buffer(&payload),
            Command::List => match self.session.ls() {
                Ok(entries) => {
                    for entry in entries {
                        writeln!(self.out, "{entry}")?;
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            },
            Command::Resize { name, size } => self.session.resize(name, size),
            Command::Defrag => self.session.defrag(),
            Command::Cd(name) => self.session.cd(name),
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) => self.report(&err, &disk),
        }
    }

    fn mount(&mut self, disk: String) -> io::Result<()> {
        let block_file = match BlockFile::open(&disk) {
            Ok(block_file) => block_file,
            Err(err) => {
                log::warn!("{disk}: {err}");
                return writeln!(self.err, "Error: Cannot find disk {disk}");
            }
        };

        match self.session.mount(Arc::new(block_file)) {
            Ok(()) => {
                log::info!("mounted {disk}");
                self.disk = Some(disk);
                Ok(())
            }
            Err(err) => self.report(&err, &disk),
        }
    }

    fn report(&mut self, err: &Error, disk: &str) -> io::Result<()> {
        writeln!(self.err, "Error: {}", message(err, disk))
    }
}

/// 面向用户的错误信息
pub fn message(err: &Error, disk: &str) -> String {
    match err {
        Error::NotMounted => "No file system is mounted".to_owned(),
        Error::Device(err) => format!("Disk I/O on {disk} failed: {err}"),
        Error::Inconsistent(rule) => format!(
            "File system in {disk} is inconsistent (error code: {})",
            rule.code()
        ),
        Error::NoFreeInode(name) => {
            format!("Superblock in disk {disk} is full, cannot create {name}")
        }
        Error::NoSpace { blocks, .. } => format!("Cannot allocate {blocks} blocks on {disk}"),
        Error::NameConflict(name) => format!("File or directory {name} already exists"),
        Error::NotFound(name) => format!("File or directory {name} does not exist"),
        Error::FileNotFound(name) => format!("File {name} does not exist"),
        Error::DirNotFound(name) => format!("Directory {name} does not exist"),
        Error::OutOfRange { name, block } => format!("{name} does not have block {block}"),
        Error::ResizeFailure { name, size } => {
            format!("File {name} cannot expand to size {size}")
        }
        Error::BufferOverflow { .. } => err.to_string(),
    }
}
