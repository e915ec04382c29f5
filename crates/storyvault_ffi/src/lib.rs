//! Flutter-facing bridge for StoryVault core.

pub mod api;
