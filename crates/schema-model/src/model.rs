//! Declarative schema file types.
//!
//! These types mirror the YAML schema file one-to-one and only validate its
//! shape. Defaults, inheritance and path resolution happen later, when
//! [`crate::build`] converts a [`SchemaModel`] into a [`crate::Schema`].
//!
//! ```yaml
//! database: exports.db
//! resize: 0.5
//! documents:
//!   art/hero.xcf:
//!     default: hide
//!     exports:
//!       out/hero-idle.png:
//!         crop: bounding-box
//!         show:
//!           - background
//!           - group: body
//!             show: [torso, { layer: head, mask: show }]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Visibility or mask decision for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Make visible / apply the mask.
    Show,
    /// Make hidden / stop applying the mask.
    Hide,
    /// Keep whatever state the document already has.
    Leave,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Hide => "hide",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Top-level schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SchemaModel {
    /// Metadata database location, relative to the schema file.
    pub database: PathBuf,

    /// Default resize for every export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeModel>,

    /// Source documents keyed by path, relative to the schema file.
    #[serde(default)]
    pub documents: BTreeMap<PathBuf, DocumentModel>,
}

/// One source document and its exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DocumentModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Action>,

    /// Default mask decision for every layer of this document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeModel>,

    /// Exports keyed by output path, relative to the schema file.
    #[serde(default)]
    pub exports: BTreeMap<PathBuf, ExportModel>,
}

/// One output artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExportModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropModel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeModel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<Rules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<Rules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave: Option<Rules>,
}

/// A single rule or a list of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Rules {
    Many(Vec<RuleNode>),
    One(Box<RuleNode>),
}

impl Rules {
    /// Iterate the rules in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, RuleNode> {
        match self {
            Self::Many(nodes) => nodes.iter(),
            Self::One(node) => std::slice::from_ref(node.as_ref()).iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Many(nodes) => nodes.len(),
            Self::One(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A node of the nested layer rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RuleNode {
    /// Bare layer name; takes the action of the list it appears in.
    Name(String),
    Layer(LayerRule),
    Group(GroupRule),
}

/// A layer with an explicit mask decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LayerRule {
    pub layer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Action>,
}

/// A layer group with nested rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GroupRule {
    pub group: String,

    /// Default action for layers inside the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Action>,

    /// Default mask decision for layers inside the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<Rules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<Rules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave: Option<Rules>,
}

impl GroupRule {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            default: None,
            mask: None,
            show: None,
            hide: None,
            leave: None,
        }
    }
}

/// Crop selector: `bounding-box`, `{algorithm: bounding-box}`, or a layer name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CropModel {
    Algorithm { algorithm: CropAlgorithm },
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CropAlgorithm {
    #[serde(rename = "bounding-box")]
    BoundingBox,
}

/// Resize rule: a scale factor or a target width and/or height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ResizeModel {
    Scale(f64),
    Size(SizeModel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SizeModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl SchemaModel {
    /// Parse a schema from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Read and parse a schema file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&text).map_err(|e| SchemaError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// JSON Schema describing the schema file, pretty-printed.
pub fn json_schema_pretty() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schemars::schema_for!(SchemaModel))
}
