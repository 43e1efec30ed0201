mod accounts;
mod authentication;
pub mod cli;
mod client_ip;
mod database;
mod email;
mod http_err;
mod passwords;
mod rate_limit;
mod repos;
mod reviews;
mod server;
