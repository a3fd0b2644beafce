pub mod audit;
pub mod company;
pub mod record;
pub mod role;
pub mod user;
