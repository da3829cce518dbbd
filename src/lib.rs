//! Embeddable docking/tiling panel-layout engine.
//!
//! The engine owns a tree of renderables (rows, columns, tabbed stacks and
//! component panes), computes their pixel geometry, resolves drag-and-drop
//! docking, and snapshots/restores the arrangement.

pub mod backend;
pub mod common;
pub mod drag;
pub mod layout_engine;
pub mod model;
