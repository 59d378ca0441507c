//! # IO Module
//!
//! Interface layer that exposes the domain services to clients. The only
//! interface today is the JSON REST API under `/api`.

pub mod rest;
