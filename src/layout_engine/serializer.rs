//! Type-tagged snapshots of the layout tree.
//!
//! Every node kind has a serializer registered under a discriminator. A
//! snapshot node is `{ name, tags, ...fields }` and nests its children the
//! same way, so a [`SerializerContainer`] can restore any of them from the
//! `name` alone. Restoring yields configuration, not live nodes; the layout
//! builds the tree from it as usual.

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_with::{DeserializeAs, SerializeAs, serde_as};
use tracing::{debug, instrument};

use super::config::{
    ComponentConfig, ContentConfig, NodeConfig, SplitConfig, SplitItemConfig, StackConfig,
    StackItemConfig,
};
use super::dock::DockLayout;
use super::error::{DockError, SerializeError};
use super::graph::{Direction, Orientation, RenderableKind};
use super::renderable::{Control, ItemFlags};
use crate::common::collections::HashMap;
use crate::model::NodeId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SerializedNode {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// What a snapshot node turns back into.
#[derive(Debug, Clone, PartialEq)]
pub enum Restored {
    Node(NodeConfig),
    SplitItem(SplitItemConfig),
    StackItem(StackItemConfig),
    Control(Control),
}

impl Restored {
    fn describe(&self) -> &'static str {
        match self {
            Restored::Node(_) => "node",
            Restored::SplitItem(_) => XY_ITEM,
            Restored::StackItem(_) => STACK_ITEM,
            Restored::Control(_) => "control",
        }
    }

    fn unexpected(self, expected: &'static str) -> SerializeError {
        SerializeError::Unexpected { name: self.describe().to_string(), expected }
    }

    pub fn into_node(self) -> Result<NodeConfig, SerializeError> {
        match self {
            Restored::Node(node) => Ok(node),
            other => Err(other.unexpected("node")),
        }
    }

    pub fn into_split_item(self) -> Result<SplitItemConfig, SerializeError> {
        match self {
            Restored::SplitItem(item) => Ok(item),
            other => Err(other.unexpected(XY_ITEM)),
        }
    }

    pub fn into_stack_item(self) -> Result<StackItemConfig, SerializeError> {
        match self {
            Restored::StackItem(item) => Ok(item),
            other => Err(other.unexpected(STACK_ITEM)),
        }
    }
}

pub const XY_CONTAINER: &str = "XYContainer";
pub const XY_ITEM: &str = "XYItemContainer";
pub const STACK: &str = "Stack";
pub const STACK_ITEM: &str = "StackItemContainer";
pub const COMPONENT: &str = "Component";

pub trait NodeSerializer {
    fn name(&self) -> &'static str;

    fn kind(&self) -> RenderableKind;

    /// Nodes left out of snapshots altogether.
    fn exclude(&self, _dock: &DockLayout, _node: NodeId) -> bool { false }

    fn serialize(
        &self,
        cx: &SerializerContainer,
        dock: &DockLayout,
        node: NodeId,
    ) -> Result<Map<String, Value>, SerializeError>;

    fn deserialize(&self, cx: &SerializerContainer, node: &SerializedNode) -> Result<Restored, SerializeError>;
}

/// Serializer for one [`Control`] variant.
pub trait ControlSerializer {
    fn name(&self) -> &'static str;

    fn accepts(&self, control: &Control) -> bool;

    fn serialize(&self, control: &Control) -> Result<Map<String, Value>, SerializeError>;

    fn deserialize(&self, node: &SerializedNode) -> Result<Control, SerializeError>;
}

fn to_fields<T: Serialize>(name: &str, value: &T) -> Result<Map<String, Value>, SerializeError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SerializeError::Encoding(format!("`{name}` produced {other} instead of an object"))),
        Err(source) => Err(SerializeError::Fields { name: name.to_string(), source }),
    }
}

fn from_fields<T: DeserializeOwned>(node: &SerializedNode) -> Result<T, SerializeError> {
    serde_json::from_value(Value::Object(node.fields.clone()))
        .map_err(|source| SerializeError::Fields { name: node.name.clone(), source })
}

/// Infinite sizes are written as `null`.
struct Unbounded;

impl SerializeAs<f64> for Unbounded {
    fn serialize_as<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        if value.is_finite() { serializer.serialize_some(value) } else { serializer.serialize_none() }
    }
}

impl<'de> DeserializeAs<'de, f64> for Unbounded {
    fn deserialize_as<D>(deserializer: D) -> Result<f64, D::Error>
    where D: Deserializer<'de> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

fn unbounded() -> f64 { f64::INFINITY }

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct XyContainerFields {
    direction: Orientation,
    #[serde(rename = "static")]
    is_static: bool,
    splitter_size: f64,
    children: Vec<SerializedNode>,
}

#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct XyItemFields {
    ratio: Option<f64>,
    #[serde(default)]
    min_size_x: f64,
    #[serde(default)]
    min_size_y: f64,
    #[serde_as(as = "Unbounded")]
    #[serde(default = "unbounded")]
    max_size_x: f64,
    #[serde_as(as = "Unbounded")]
    #[serde(default = "unbounded")]
    max_size_y: f64,
    #[serde(default)]
    minimized: bool,
    #[serde(default)]
    last_size: Option<f64>,
    #[serde(rename = "use")]
    content: Box<SerializedNode>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HeaderFields {
    size: f64,
    tab_width: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StackFields {
    direction: Direction,
    reverse: bool,
    active_index: usize,
    header: HeaderFields,
    #[serde(default)]
    controls: Vec<SerializedNode>,
    children: Vec<SerializedNode>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StackItemFields {
    title: String,
    draggable: bool,
    droppable: bool,
    closeable: bool,
    persist: bool,
    #[serde(default)]
    tab_controls: Vec<SerializedNode>,
    #[serde(rename = "use")]
    content: Box<SerializedNode>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentFields {
    component: String,
    #[serde(default)]
    props: Value,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomControlFields {
    id: String,
    #[serde(default)]
    label: Option<String>,
}

fn content_of(dock: &DockLayout, wrapper: NodeId) -> Result<NodeId, SerializeError> {
    dock.children(wrapper).first().copied().ok_or(SerializeError::MissingChild(wrapper))
}

fn restored_content(cx: &SerializerContainer, node: &SerializedNode) -> Result<ContentConfig, SerializeError> {
    Ok(ContentConfig::from(cx.deserialize(node)?.into_node()?))
}

struct XyContainerSerializer;

impl NodeSerializer for XyContainerSerializer {
    fn name(&self) -> &'static str { XY_CONTAINER }

    fn kind(&self) -> RenderableKind { RenderableKind::XyContainer }

    fn serialize(
        &self,
        cx: &SerializerContainer,
        dock: &DockLayout,
        node: NodeId,
    ) -> Result<Map<String, Value>, SerializeError> {
        let c = dock.xy_container(node).map_err(|_| SerializeError::UnknownNode(node))?;
        let fields = XyContainerFields {
            direction: c.orientation,
            is_static: c.is_static,
            splitter_size: c.splitter_size,
            children: cx.serialize_children(dock, node)?,
        };
        to_fields(self.name(), &fields)
    }

    fn deserialize(&self, cx: &SerializerContainer, node: &SerializedNode) -> Result<Restored, SerializeError> {
        let fields: XyContainerFields = from_fields(node)?;
        let children = fields
            .children
            .iter()
            .map(|child| cx.deserialize(child)?.into_split_item())
            .collect::<Result<_, _>>()?;
        let split = SplitConfig {
            children,
            splitter_size: Some(fields.splitter_size),
            is_static: fields.is_static,
            tags: node.tags.clone(),
        };
        Ok(Restored::Node(match fields.direction {
            Orientation::Horizontal => NodeConfig::Row(split),
            Orientation::Vertical => NodeConfig::Column(split),
        }))
    }
}

struct XyItemSerializer;

impl NodeSerializer for XyItemSerializer {
    fn name(&self) -> &'static str { XY_ITEM }

    fn kind(&self) -> RenderableKind { RenderableKind::XyItem }

    fn serialize(
        &self,
        cx: &SerializerContainer,
        dock: &DockLayout,
        node: NodeId,
    ) -> Result<Map<String, Value>, SerializeError> {
        let item = dock.xy_item(node).map_err(|_| SerializeError::UnknownNode(node))?;
        let fields = XyItemFields {
            ratio: item.ratio,
            min_size_x: item.min_size.x,
            min_size_y: item.min_size.y,
            max_size_x: item.max_size.x,
            max_size_y: item.max_size.y,
            minimized: item.is_minimized,
            last_size: item.last_size,
            content: Box::new(cx.serialize(dock, content_of(dock, node)?)?),
        };
        to_fields(self.name(), &fields)
    }

    fn deserialize(&self, cx: &SerializerContainer, node: &SerializedNode) -> Result<Restored, SerializeError> {
        let fields: XyItemFields = from_fields(node)?;
        let finite = |v: f64| v.is_finite().then_some(v);
        Ok(Restored::SplitItem(SplitItemConfig {
            content: restored_content(cx, &fields.content)?,
            ratio: fields.ratio,
            min_size_x: Some(fields.min_size_x),
            min_size_y: Some(fields.min_size_y),
            max_size_x: finite(fields.max_size_x),
            max_size_y: finite(fields.max_size_y),
            minimized: fields.minimized,
            last_size: fields.last_size,
            tags: node.tags.clone(),
        }))
    }
}

struct StackSerializer;

impl NodeSerializer for StackSerializer {
    fn name(&self) -> &'static str { STACK }

    fn kind(&self) -> RenderableKind { RenderableKind::Stack }

    fn serialize(
        &self,
        cx: &SerializerContainer,
        dock: &DockLayout,
        node: NodeId,
    ) -> Result<Map<String, Value>, SerializeError> {
        let stack = dock.stack(node).map_err(|_| SerializeError::UnknownNode(node))?;
        let kept: Vec<NodeId> =
            dock.children(node).iter().copied().filter(|&c| !cx.is_excluded(dock, c)).collect();
        let active_index = stack
            .active_item()
            .and_then(|active| kept.iter().position(|&c| c == active))
            .unwrap_or(0);
        let fields = StackFields {
            direction: stack.direction,
            reverse: stack.reverse,
            active_index,
            header: HeaderFields {
                size: stack.header.size,
                tab_width: stack.header.tab_width,
            },
            controls: stack.header.controls.iter().map(|c| cx.serialize_control(c)).collect::<Result<_, _>>()?,
            children: kept.iter().map(|&c| cx.serialize(dock, c)).collect::<Result<_, _>>()?,
        };
        to_fields(self.name(), &fields)
    }

    fn deserialize(&self, cx: &SerializerContainer, node: &SerializedNode) -> Result<Restored, SerializeError> {
        let fields: StackFields = from_fields(node)?;
        let children = fields
            .children
            .iter()
            .map(|child| cx.deserialize(child)?.into_stack_item())
            .collect::<Result<_, _>>()?;
        Ok(Restored::Node(NodeConfig::Stack(StackConfig {
            children,
            direction: fields.direction,
            reverse: fields.reverse,
            active_index: fields.active_index,
            header_size: Some(fields.header.size),
            tab_width: Some(fields.header.tab_width),
            controls: cx.deserialize_controls(&fields.controls)?,
            tags: node.tags.clone(),
        })))
    }
}

struct StackItemSerializer;

impl NodeSerializer for StackItemSerializer {
    fn name(&self) -> &'static str { STACK_ITEM }

    fn kind(&self) -> RenderableKind { RenderableKind::StackItem }

    fn exclude(&self, dock: &DockLayout, node: NodeId) -> bool {
        dock.stack_item(node).is_ok_and(|i| !i.flags.contains(ItemFlags::PERSIST))
    }

    fn serialize(
        &self,
        cx: &SerializerContainer,
        dock: &DockLayout,
        node: NodeId,
    ) -> Result<Map<String, Value>, SerializeError> {
        let item = dock.stack_item(node).map_err(|_| SerializeError::UnknownNode(node))?;
        let fields = StackItemFields {
            title: item.title.clone(),
            draggable: item.flags.contains(ItemFlags::DRAGGABLE),
            droppable: item.flags.contains(ItemFlags::DROPPABLE),
            closeable: item.flags.contains(ItemFlags::CLOSEABLE),
            persist: item.flags.contains(ItemFlags::PERSIST),
            tab_controls: item.tab_controls.iter().map(|c| cx.serialize_control(c)).collect::<Result<_, _>>()?,
            content: Box::new(cx.serialize(dock, content_of(dock, node)?)?),
        };
        to_fields(self.name(), &fields)
    }

    fn deserialize(&self, cx: &SerializerContainer, node: &SerializedNode) -> Result<Restored, SerializeError> {
        let fields: StackItemFields = from_fields(node)?;
        Ok(Restored::StackItem(StackItemConfig {
            content: restored_content(cx, &fields.content)?,
            title: Some(fields.title),
            draggable: fields.draggable,
            droppable: fields.droppable,
            closeable: fields.closeable,
            persist: fields.persist,
            tab_controls: cx.deserialize_controls(&fields.tab_controls)?,
            tags: node.tags.clone(),
        }))
    }
}

struct ComponentSerializer;

impl NodeSerializer for ComponentSerializer {
    fn name(&self) -> &'static str { COMPONENT }

    fn kind(&self) -> RenderableKind { RenderableKind::Component }

    fn serialize(
        &self,
        _cx: &SerializerContainer,
        dock: &DockLayout,
        node: NodeId,
    ) -> Result<Map<String, Value>, SerializeError> {
        let pane = dock
            .renderable(node)
            .and_then(|r| r.as_component())
            .ok_or(SerializeError::UnknownNode(node))?;
        let fields = ComponentFields {
            component: pane.component.clone(),
            props: pane.props.clone(),
        };
        to_fields(self.name(), &fields)
    }

    fn deserialize(&self, _cx: &SerializerContainer, node: &SerializedNode) -> Result<Restored, SerializeError> {
        let fields: ComponentFields = from_fields(node)?;
        Ok(Restored::Node(NodeConfig::Component(ComponentConfig {
            component: fields.component,
            props: fields.props,
            tags: node.tags.clone(),
        })))
    }
}

/// Serializer for a control without settings.
struct UnitControl {
    name: &'static str,
    control: Control,
}

impl ControlSerializer for UnitControl {
    fn name(&self) -> &'static str { self.name }

    fn accepts(&self, control: &Control) -> bool { *control == self.control }

    fn serialize(&self, _control: &Control) -> Result<Map<String, Value>, SerializeError> { Ok(Map::new()) }

    fn deserialize(&self, node: &SerializedNode) -> Result<Control, SerializeError> {
        if let Some(field) = node.fields.keys().next() {
            return Err(SerializeError::Encoding(format!("`{}` takes no fields, got `{field}`", self.name)));
        }
        Ok(self.control.clone())
    }
}

struct CustomControlSerializer;

impl ControlSerializer for CustomControlSerializer {
    fn name(&self) -> &'static str { "CustomControl" }

    fn accepts(&self, control: &Control) -> bool { matches!(control, Control::Custom { .. }) }

    fn serialize(&self, control: &Control) -> Result<Map<String, Value>, SerializeError> {
        let Control::Custom { id, label } = control else {
            return Err(SerializeError::UnknownControl(format!("{control:?}")));
        };
        to_fields(self.name(), &CustomControlFields { id: id.clone(), label: label.clone() })
    }

    fn deserialize(&self, node: &SerializedNode) -> Result<Control, SerializeError> {
        let fields: CustomControlFields = from_fields(node)?;
        Ok(Control::Custom { id: fields.id, label: fields.label })
    }
}

/// Registry of serializers, looked up by discriminator or node kind.
pub struct SerializerContainer {
    nodes: HashMap<&'static str, Box<dyn NodeSerializer>>,
    kinds: HashMap<RenderableKind, &'static str>,
    controls: Vec<Box<dyn ControlSerializer>>,
}

impl Default for SerializerContainer {
    fn default() -> Self {
        let mut cx = Self::empty();
        cx.register(XyContainerSerializer);
        cx.register(XyItemSerializer);
        cx.register(StackSerializer);
        cx.register(StackItemSerializer);
        cx.register(ComponentSerializer);
        cx.register_control(UnitControl { name: "CloseControl", control: Control::Close });
        cx.register_control(UnitControl { name: "MinimizeControl", control: Control::Minimize });
        cx.register_control(UnitControl { name: "MaximizeControl", control: Control::Maximize });
        cx.register_control(CustomControlSerializer);
        cx
    }
}

impl SerializerContainer {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        SerializerContainer {
            nodes: HashMap::default(),
            kinds: HashMap::default(),
            controls: Vec::new(),
        }
    }

    /// Registers `serializer`, replacing any earlier one for the same name or kind.
    pub fn register(&mut self, serializer: impl NodeSerializer + 'static) {
        self.kinds.insert(serializer.kind(), serializer.name());
        self.nodes.insert(serializer.name(), Box::new(serializer));
    }

    pub fn register_control(&mut self, serializer: impl ControlSerializer + 'static) {
        self.controls.retain(|c| c.name() != serializer.name());
        self.controls.push(Box::new(serializer));
    }

    fn for_node(&self, dock: &DockLayout, node: NodeId) -> Result<&dyn NodeSerializer, SerializeError> {
        let kind = dock.kind(node).ok_or(SerializeError::UnknownNode(node))?;
        self.kinds
            .get(&kind)
            .and_then(|name| self.nodes.get(name))
            .map(|s| s.as_ref())
            .ok_or(SerializeError::UnknownKind(kind))
    }

    pub fn is_excluded(&self, dock: &DockLayout, node: NodeId) -> bool {
        self.for_node(dock, node).is_ok_and(|s| s.exclude(dock, node))
    }

    pub fn serialize(&self, dock: &DockLayout, node: NodeId) -> Result<SerializedNode, SerializeError> {
        let serializer = self.for_node(dock, node)?;
        Ok(SerializedNode {
            name: serializer.name().to_string(),
            tags: dock.tags(node).map(|t| t.iter().cloned().collect()).unwrap_or_default(),
            fields: serializer.serialize(self, dock, node)?,
        })
    }

    /// Serializes the children of `node` that are not excluded.
    pub fn serialize_children(&self, dock: &DockLayout, node: NodeId) -> Result<Vec<SerializedNode>, SerializeError> {
        dock.children(node)
            .iter()
            .filter(|&&c| !self.is_excluded(dock, c))
            .map(|&c| self.serialize(dock, c))
            .collect()
    }

    pub fn deserialize(&self, node: &SerializedNode) -> Result<Restored, SerializeError> {
        let serializer = self
            .nodes
            .get(node.name.as_str())
            .ok_or_else(|| SerializeError::UnknownName(node.name.clone()))?;
        serializer.deserialize(self, node)
    }

    pub fn serialize_control(&self, control: &Control) -> Result<SerializedNode, SerializeError> {
        let serializer = self
            .controls
            .iter()
            .find(|s| s.accepts(control))
            .ok_or_else(|| SerializeError::UnknownControl(format!("{control:?}")))?;
        Ok(SerializedNode {
            name: serializer.name().to_string(),
            tags: Vec::new(),
            fields: serializer.serialize(control)?,
        })
    }

    pub fn deserialize_control(&self, node: &SerializedNode) -> Result<Control, SerializeError> {
        self.controls
            .iter()
            .find(|s| s.name() == node.name)
            .ok_or_else(|| SerializeError::UnknownControl(node.name.clone()))?
            .deserialize(node)
    }

    fn deserialize_controls(&self, nodes: &[SerializedNode]) -> Result<Vec<Control>, SerializeError> {
        nodes.iter().map(|n| self.deserialize_control(n)).collect()
    }

    /// Snapshot of the root content, `None` for an empty layout.
    #[instrument(skip_all)]
    pub fn snapshot(&self, dock: &DockLayout) -> Result<Option<SerializedNode>, SerializeError> {
        dock.content().map(|content| self.serialize(dock, content)).transpose()
    }
}

impl DockLayout {
    /// Replaces the root content with the tree described by `snapshot`.
    pub fn restore(&mut self, cx: &SerializerContainer, snapshot: &SerializedNode) -> Result<NodeId, DockError> {
        let config = cx.deserialize(snapshot)?.into_node()?;
        debug!(name = %snapshot.name, "restoring snapshot");
        self.load(&config)
    }
}

/// On-disk encodings of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    Ron,
}

impl SnapshotFormat {
    /// `.ron` files are RON, everything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => SnapshotFormat::Ron,
            _ => SnapshotFormat::Json,
        }
    }

    pub fn encode(self, node: &SerializedNode) -> Result<String, SerializeError> {
        match self {
            SnapshotFormat::Json => {
                serde_json::to_string_pretty(node).map_err(|e| SerializeError::Encoding(e.to_string()))
            }
            SnapshotFormat::Ron => ron::ser::to_string_pretty(node, ron::ser::PrettyConfig::default())
                .map_err(|e| SerializeError::Encoding(e.to_string())),
        }
    }

    pub fn decode(self, text: &str) -> Result<SerializedNode, SerializeError> {
        match self {
            SnapshotFormat::Json => serde_json::from_str(text).map_err(|e| SerializeError::Encoding(e.to_string())),
            SnapshotFormat::Ron => ron::from_str(text).map_err(|e| SerializeError::Encoding(e.to_string())),
        }
    }
}

pub fn write_snapshot(path: &Path, node: &SerializedNode) -> anyhow::Result<()> {
    let format = SnapshotFormat::from_path(path);
    let text = format.encode(node)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {format} snapshot {}", path.display()))
}

pub fn read_snapshot(path: &Path) -> anyhow::Result<SerializedNode> {
    let format = SnapshotFormat::from_path(path);
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format.decode(&text)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn node(value: Value) -> SerializedNode { serde_json::from_value(value).unwrap() }

    #[test]
    fn unknown_discriminator_is_named() {
        let cx = SerializerContainer::default();
        let err = cx.deserialize(&node(json!({ "name": "Carousel" }))).unwrap_err();
        assert!(matches!(err, SerializeError::UnknownName(ref name) if name == "Carousel"));
        assert_eq!(err.to_string(), "No serializer registered for `Carousel`");
    }

    #[test]
    fn item_fields_restore_with_unbounded_max() {
        let cx = SerializerContainer::default();
        let item = node(json!({
            "name": "XYItemContainer",
            "tags": ["main"],
            "ratio": null,
            "minSizeX": 40.0,
            "minSizeY": 0.0,
            "maxSizeX": null,
            "maxSizeY": 300.0,
            "minimized": false,
            "lastSize": null,
            "use": { "name": "Component", "component": "editor", "props": { "path": "a.rs" } }
        }));
        let restored = cx.deserialize(&item).unwrap().into_split_item().unwrap();
        assert_eq!(restored.ratio, None);
        assert_eq!(restored.min_size().x, 40.0);
        assert_eq!(restored.max_size().x, f64::INFINITY);
        assert_eq!(restored.max_size().y, 300.0);
        assert_eq!(restored.tags, vec!["main".to_string()]);
        let NodeConfig::Component(c) = restored.content.into_node() else { panic!("expected component") };
        assert_eq!(c.props, json!({ "path": "a.rs" }));
    }

    #[test]
    fn misplaced_node_is_rejected() {
        let cx = SerializerContainer::default();
        let row = node(json!({
            "name": "XYContainer",
            "direction": "horizontal",
            "static": false,
            "splitterSize": 5.0,
            "children": [{ "name": "Component", "component": "editor" }]
        }));
        let err = cx.deserialize(&row).unwrap_err();
        assert!(matches!(err, SerializeError::Unexpected { expected: XY_ITEM, .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let cx = SerializerContainer::default();
        let err = cx
            .deserialize(&node(json!({ "name": "Component", "component": "x", "colour": "red" })))
            .unwrap_err();
        assert!(matches!(err, SerializeError::Fields { .. }));
    }

    #[test]
    fn controls_round_trip() {
        let cx = SerializerContainer::default();
        let controls = [
            Control::Close,
            Control::Minimize,
            Control::Maximize,
            Control::Custom { id: "pin".into(), label: Some("Pin".into()) },
        ];
        let names: Vec<_> = controls.iter().map(|c| cx.serialize_control(c).unwrap().name).collect();
        assert_eq!(names, ["CloseControl", "MinimizeControl", "MaximizeControl", "CustomControl"]);
        for control in controls {
            let serialized = cx.serialize_control(&control).unwrap();
            assert_eq!(cx.deserialize_control(&serialized).unwrap(), control);
        }
        let err = cx.deserialize_control(&node(json!({ "name": "PopoutControl" }))).unwrap_err();
        assert!(matches!(err, SerializeError::UnknownControl(_)));
    }

    #[test]
    fn empty_registry_names_the_missing_kind() {
        let cx = SerializerContainer::empty();
        let err = cx.deserialize(&node(json!({ "name": "Stack" }))).unwrap_err();
        assert!(matches!(err, SerializeError::UnknownName(_)));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("layout.ron")), SnapshotFormat::Ron);
        assert_eq!(SnapshotFormat::from_path(Path::new("layout.json")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::from_path(Path::new("layout")), SnapshotFormat::Json);
    }

    #[test]
    fn json_and_ron_files_round_trip() {
        let snapshot = node(json!({
            "name": "Component",
            "tags": ["a"],
            "component": "editor",
            "props": { "path": "main.rs", "line": 3 }
        }));
        let dir = tempfile::tempdir().unwrap();
        for file in ["snap.json", "snap.ron"] {
            let path = dir.path().join(file);
            write_snapshot(&path, &snapshot).unwrap();
            assert_eq!(read_snapshot(&path).unwrap(), snapshot);
        }
    }
}
