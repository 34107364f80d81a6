//! Business logic services.

pub mod access;
pub mod analytics;
pub mod auth;
pub mod category;
pub mod dashboard;
pub mod inventory;
pub mod message;
pub mod notification;
pub mod order;
pub mod product;
pub mod realtime;
pub mod shop;
pub mod signup;
pub mod storage;
