
mod block_file;
mod command;
mod shell;

pub use self::{
    block_file::BlockFile,
    command::{Command, CommandError},
    shell::{message, Shell},
};
