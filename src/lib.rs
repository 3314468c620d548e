//! Core engine for a 64-team single-elimination pick'em: the bracket tree,
//! pick mutation with cascading invalidation, and scoring/standings for the
//! best-bracket and worst-bracket challenge formats.
//!
//! Everything here is pure, synchronous computation over in-memory values.
//! Persistence, HTTP, auth, and results ingestion are external collaborators:
//! they hand in stored pick maps and finalized results, and take back
//! sanitized pick maps and ranked [`scoring::LeaderboardRow`]s.

pub mod config;
pub mod field;
pub mod picks;
pub mod results;
pub mod scoring;
pub mod slot;
pub mod tree;
