//! Core business logic for Expensa.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and workflow decisions live here.
//!
//! # Modules
//!
//! - `access` - Roles and the capabilities callers check before invoking the engine
//! - `currency` - Conversion of claimed amounts into the company currency
//! - `workflow` - Approval rules, the workflow initiator and evaluator

pub mod access;
pub mod currency;
pub mod workflow;
