//! Seams to the host: mounting components and drawing the layout.
//!
//! The engine never touches pixels. It hands a [`RenderDescription`] to a
//! [`RenderBackend`] and lets a [`ComponentBridge`] mount the actual content
//! of each component pane.

use serde::Serialize;
use serde_json::Value;

use crate::layout_engine::RenderableKind;
use crate::model::{NodeId, RenderableArea};

/// Lifecycle hooks of a mounted component.
pub trait ComponentHandle {
    /// The pane became part of the tree under the layout root.
    fn on_attach(&mut self) {}
    /// The pane left the tree under the layout root.
    fn on_detach(&mut self) {}
    fn on_resize(&mut self, _area: RenderableArea) {}
    fn on_visibility_change(&mut self, _visible: bool) {}
    fn on_before_destroy(&mut self) {}
}

pub trait ComponentBridge {
    /// Mounts `component` into `pane`. An error leaves the layout unchanged.
    fn mount(
        &mut self,
        component: &str,
        props: &Value,
        pane: NodeId,
    ) -> anyhow::Result<Box<dyn ComponentHandle>>;
}

/// Accepts any component name and mounts nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessBridge;

struct Inert;

impl ComponentHandle for Inert {}

impl ComponentBridge for HeadlessBridge {
    fn mount(
        &mut self,
        _component: &str,
        _props: &Value,
        _pane: NodeId,
    ) -> anyhow::Result<Box<dyn ComponentHandle>> {
        Ok(Box::new(Inert))
    }
}

pub trait RenderBackend {
    fn render(&mut self, description: &RenderDescription);
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderDescription {
    pub bounds: RenderableArea,
    pub root: RenderNode,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: NodeId,
    pub kind: RenderableKind,
    pub area: RenderableArea,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub splitters: Vec<RenderSplitter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RenderHeader>,
    pub children: Vec<RenderNode>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderSplitter {
    pub area: RenderableArea,
    pub disabled: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderHeader {
    pub area: RenderableArea,
    pub tabs: Vec<RenderTab>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderTab {
    pub item: NodeId,
    pub title: String,
    pub area: RenderableArea,
    pub active: bool,
}
