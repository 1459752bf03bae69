// src/models/mod.rs

pub mod category;
pub mod comment;
pub mod genre;
pub mod query;
pub mod review;
pub mod slug;
pub mod title;
pub mod user;
