//! Integration test crate for StillShot.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! A scripted in-memory backend stands in for the GPU.

#[cfg(test)]
mod mock;

#[cfg(test)]
mod budget;

#[cfg(test)]
mod capture;

#[cfg(test)]
mod preview;

#[cfg(test)]
mod settings;
