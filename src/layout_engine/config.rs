//! Declarative layout description the engine materializes into live nodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::graph::Direction;
use super::renderable::{AxisBounds, Control, ItemFlags};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Row(SplitConfig),
    Column(SplitConfig),
    Stack(StackConfig),
    Component(ComponentConfig),
}

/// Either a bare component name or a nested node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ContentConfig {
    Component(String),
    Node(Box<NodeConfig>),
}

impl From<NodeConfig> for ContentConfig {
    fn from(config: NodeConfig) -> Self { ContentConfig::Node(Box::new(config)) }
}

impl ContentConfig {
    pub fn into_node(self) -> NodeConfig {
        match self {
            ContentConfig::Component(component) => NodeConfig::Component(ComponentConfig {
                component,
                ..Default::default()
            }),
            ContentConfig::Node(node) => *node,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct SplitConfig {
    #[serde(default)]
    pub children: Vec<SplitItemConfig>,
    #[serde(default, alias = "splitterSize")]
    pub splitter_size: Option<f64>,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SplitItemConfig {
    #[serde(rename = "use")]
    pub content: ContentConfig,
    #[serde(default)]
    pub ratio: Option<f64>,
    #[serde(default, alias = "minSizeX")]
    pub min_size_x: Option<f64>,
    #[serde(default, alias = "minSizeY")]
    pub min_size_y: Option<f64>,
    #[serde(default, alias = "maxSizeX")]
    pub max_size_x: Option<f64>,
    #[serde(default, alias = "maxSizeY")]
    pub max_size_y: Option<f64>,
    #[serde(default)]
    pub minimized: bool,
    #[serde(default, alias = "lastSize")]
    pub last_size: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SplitItemConfig {
    pub fn new(content: impl Into<ContentConfig>) -> Self {
        SplitItemConfig {
            content: content.into(),
            ratio: None,
            min_size_x: None,
            min_size_y: None,
            max_size_x: None,
            max_size_y: None,
            minimized: false,
            last_size: None,
            tags: Vec::new(),
        }
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn min_size(&self) -> AxisBounds {
        AxisBounds {
            x: self.min_size_x.unwrap_or(0.0),
            y: self.min_size_y.unwrap_or(0.0),
        }
    }

    pub fn max_size(&self) -> AxisBounds {
        AxisBounds {
            x: self.max_size_x.unwrap_or(f64::INFINITY),
            y: self.max_size_y.unwrap_or(f64::INFINITY),
        }
    }
}

impl From<String> for ContentConfig {
    fn from(component: String) -> Self { ContentConfig::Component(component) }
}

impl From<&str> for ContentConfig {
    fn from(component: &str) -> Self { ContentConfig::Component(component.to_string()) }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct StackConfig {
    #[serde(default)]
    pub children: Vec<StackItemConfig>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default, alias = "activeIndex")]
    pub active_index: usize,
    #[serde(default, alias = "headerSize")]
    pub header_size: Option<f64>,
    #[serde(default, alias = "tabWidth")]
    pub tab_width: Option<f64>,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StackItemConfig {
    #[serde(rename = "use")]
    pub content: ContentConfig,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "yes")]
    pub draggable: bool,
    #[serde(default = "yes")]
    pub droppable: bool,
    #[serde(default = "yes")]
    pub closeable: bool,
    #[serde(default = "yes")]
    pub persist: bool,
    #[serde(default, alias = "tabControls")]
    pub tab_controls: Vec<Control>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StackItemConfig {
    pub fn new(content: impl Into<ContentConfig>) -> Self {
        StackItemConfig {
            content: content.into(),
            title: None,
            draggable: true,
            droppable: true,
            closeable: true,
            persist: true,
            tab_controls: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn flags(&self) -> ItemFlags {
        let mut flags = ItemFlags::empty();
        flags.set(ItemFlags::DRAGGABLE, self.draggable);
        flags.set(ItemFlags::DROPPABLE, self.droppable);
        flags.set(ItemFlags::CLOSEABLE, self.closeable);
        flags.set(ItemFlags::PERSIST, self.persist);
        flags
    }

    /// Title shown on the tab; falls back to the component name.
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match &self.content {
            ContentConfig::Component(name) => name.clone(),
            ContentConfig::Node(node) => match node.as_ref() {
                NodeConfig::Component(c) => c.component.clone(),
                _ => String::new(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct ComponentConfig {
    pub component: String,
    #[serde(default)]
    pub props: Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn yes() -> bool { true }
