pub mod command_steps;
pub mod fixture_steps;
pub mod http_steps;
pub mod server_steps;
pub mod verify_steps;
