pub mod init;
pub mod policy;
pub mod run;
pub mod tasks;
