// src/utils/mod.rs

pub mod html;
pub mod jwt;
pub mod mail;
pub mod token;
