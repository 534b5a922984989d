mod cli;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use cli::{Action, Cli};
use tiny_fs::{check, SuperBlock};
use tiny_fs_shell::{BlockFile, Shell};

fn main() -> io::Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.action {
        Action::Run { commands } => {
            let mut shell = Shell::new(io::stdout().lock(), io::stderr().lock());
            shell.run_script(&commands)?;
        }
        Action::Format { image } => {
            let block_dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::create(&image)?);
            tiny_fs::format(&block_dev).map_err(io::Error::other)?;
            println!("formatted {}", image.display());
        }
        Action::Check { image } => {
            let block_dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(&image)?);
            let sb = SuperBlock::load(&block_dev).map_err(io::Error::other)?;

            let violations = check::violations(&sb);
            if violations.is_empty() {
                println!("{}: consistent", image.display());
                return Ok(ExitCode::SUCCESS);
            }
            for rule in violations.iter() {
                println!("{}: rule {} violated ({rule:?})", image.display(), rule.code());
            }
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}
