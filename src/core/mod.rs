//! Core subsystems: the card catalog and the theme preview engine.

pub mod catalog;
pub mod preview;
