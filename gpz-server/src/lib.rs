//! Nearest substation (GPZ) finder.
//!
//! A web service that answers: "which electrical substations are closest
//! to this address, and how much grid capacity do they have left?"
//! Each user may run a fixed number of lookups per calendar month.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod geocode;
pub mod lookup;
pub mod quota;
pub mod ranker;
pub mod web;
