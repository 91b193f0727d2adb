pub mod events;
pub mod health;
pub mod reports;
pub mod sites;
