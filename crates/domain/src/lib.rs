//! # autorule-domain
//!
//! Pure domain model for the autorule automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps, bounded text
//! - Define **Values** (null, bool, int, float, short string) and their comparison rules
//! - Define **Rules** (condition group → action sequence, with cooldown)
//! - Define **Actions** (LED, SSH, GPIO, webhook, log, variable write, device power)
//! - Define **Action templates** and **SSH host credentials**
//! - Define execution **results** and **statistics**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod text;
pub mod time;

pub mod automation;
pub mod result;
pub mod ssh_host;
pub mod stats;
pub mod template;
pub mod value;
