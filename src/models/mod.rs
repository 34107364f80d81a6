//! Database models and DTOs for all domain entities.

pub mod category;
pub mod inventory;
pub mod message;
pub mod notification;
pub mod order;
pub mod pagination;
pub mod product;
pub mod shop;
pub mod user;
