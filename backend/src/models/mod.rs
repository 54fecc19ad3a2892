pub mod admin;
pub mod common;
pub mod project;
pub mod site_info;
pub mod team;
pub mod ticket;
pub mod upload;
