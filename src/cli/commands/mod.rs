pub mod check;
pub mod completions;
pub mod credential_process;
pub mod list;
pub mod login;
pub mod logout;
pub mod run_as;
