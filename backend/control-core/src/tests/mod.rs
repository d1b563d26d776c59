mod config;
mod logging;
mod session;
