pub mod init;
pub mod serve;
pub mod snapshot;
pub mod trigger;
