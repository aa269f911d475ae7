pub mod cli;
pub mod demo;
pub mod http;
pub mod logging;
pub mod poll;
pub mod serve;
