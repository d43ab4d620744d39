//! Resolved schema hierarchy.
//!
//! `Schema → Document → Export → Group → layer override`. Every node carries
//! optional [`Settings`]; a node's [`Effective`] value is its own setting when
//! present, otherwise its parent's effective value, bottoming out at
//! [`Effective::SYSTEM`]. Nothing is precomputed: effective values are derived
//! on read by threading the parent's result down the ownership chain.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::SchemaError;
use crate::geometry::{Crop, Resize};
use crate::model::Action;

/// Optional local overrides held by a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Settings {
    pub action: Option<Action>,
    pub mask: Option<Action>,
    pub resize: Option<Resize>,
}

impl Settings {
    /// Settings with only an action.
    pub fn action(action: Action) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn with_mask(mut self, mask: Option<Action>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_resize(mut self, resize: Option<Resize>) -> Self {
        self.resize = resize;
        self
    }

    /// Effective values of a node with these settings under `parent`.
    pub fn resolve(&self, parent: &Effective) -> Effective {
        Effective {
            action: self.action.unwrap_or(parent.action),
            mask: self.mask.unwrap_or(parent.mask),
            resize: self.resize.or(parent.resize),
        }
    }
}

/// Fully resolved values of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effective {
    pub action: Action,
    pub mask: Action,
    pub resize: Option<Resize>,
}

impl Effective {
    /// What applies when nothing in the schema says otherwise.
    pub const SYSTEM: Effective = Effective {
        action: Action::Leave,
        mask: Action::Leave,
        resize: None,
    };
}

/// Root of the resolved hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    database_path: PathBuf,
    settings: Settings,
    documents: BTreeMap<PathBuf, Document>,
}

impl Schema {
    pub fn new(database_path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            database_path: database_path.into(),
            settings,
            documents: BTreeMap::new(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn effective(&self) -> Effective {
        self.settings.resolve(&Effective::SYSTEM)
    }

    /// Register a document, replacing any previous entry for the same path.
    pub fn add_document(&mut self, path: impl Into<PathBuf>, settings: Settings) -> &mut Document {
        let path = path.into();
        let document = Document {
            path: path.clone(),
            settings,
            exports: BTreeMap::new(),
        };
        insert_or_replace(&mut self.documents, path, document)
    }

    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Every export in document order, with its ancestors resolved.
    pub fn exports(&self) -> Vec<ExportDescriptor<'_>> {
        let schema = self.effective();
        self.documents
            .values()
            .flat_map(|document| document.descriptors(&schema))
            .collect()
    }
}

/// One source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: PathBuf,
    settings: Settings,
    exports: BTreeMap<PathBuf, Export>,
}

impl Document {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn effective(&self, schema: &Effective) -> Effective {
        self.settings.resolve(schema)
    }

    /// Register an export, replacing any previous entry for the same path.
    pub fn add_export(
        &mut self,
        path: impl Into<PathBuf>,
        crop: Option<Crop>,
        settings: Settings,
    ) -> &mut Export {
        let path = path.into();
        let export = Export {
            path: path.clone(),
            crop,
            settings,
            root: Group::default(),
        };
        insert_or_replace(&mut self.exports, path, export)
    }

    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.exports.values()
    }

    /// Descriptors for this document's exports under the given schema values.
    pub fn descriptors(&self, schema: &Effective) -> Vec<ExportDescriptor<'_>> {
        let document = self.effective(schema);
        self.exports
            .values()
            .map(|export| ExportDescriptor {
                document: self,
                export,
                effective: export.effective(&document),
            })
            .collect()
    }
}

/// One output artifact and its layer overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    path: PathBuf,
    crop: Option<Crop>,
    settings: Settings,
    root: Group,
}

impl Export {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn crop(&self) -> Option<&Crop> {
        self.crop.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn effective(&self, document: &Effective) -> Effective {
        self.settings.resolve(document)
    }

    /// The top-level group, mirroring the document's layer list.
    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }
}

/// A node mirroring a layer group in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    settings: Settings,
    layers: BTreeMap<String, Settings>,
    groups: BTreeMap<String, Group>,
}

impl Group {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set the override for a leaf layer. A later call for the same name wins.
    pub fn add_layer(&mut self, name: impl Into<String>, settings: Settings) {
        self.layers.insert(name.into(), settings);
    }

    /// Register a child group. Group names are unique among siblings.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<&mut Group, SchemaError> {
        use std::collections::btree_map::Entry;

        match self.groups.entry(name.into()) {
            Entry::Occupied(entry) => Err(SchemaError::DuplicateGroup {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => Ok(entry.insert(Group::new(settings))),
        }
    }

    pub fn layers(&self) -> impl Iterator<Item = (&str, &Settings)> {
        self.layers.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(name, g)| (name.as_str(), g))
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Resolve the layer at `path` (group names, then the leaf name).
    ///
    /// `inherited` is the effective value of this group's parent. An unknown
    /// intermediate group or leaf yields the defaults of the nearest group
    /// that does exist, as if an unconfigured layer lived there.
    pub fn get_layer<S: AsRef<str>>(&self, inherited: &Effective, path: &[S]) -> Effective {
        let defaults = self.settings.resolve(inherited);
        match path {
            [] => defaults,
            [name] => {
                let name: &str = name.as_ref();
                self.layers
                    .get(name)
                    .map_or(defaults, |layer| layer.resolve(&defaults))
            }
            [head, tail @ ..] => {
                let head: &str = head.as_ref();
                self.groups
                    .get(head)
                    .map_or(defaults, |group| group.get_layer(&defaults, tail))
            }
        }
    }

    /// Every explicitly named layer or group in this subtree.
    pub fn explicit_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        names.extend(self.layers.keys().map(String::as_str));
        for (name, group) in &self.groups {
            if !self.layers.contains_key(name) {
                names.push(name.as_str());
            }
            group.collect_names(names);
        }
    }
}

fn insert_or_replace<V>(map: &mut BTreeMap<PathBuf, V>, key: PathBuf, value: V) -> &mut V {
    use std::collections::btree_map::Entry;

    match map.entry(key) {
        Entry::Occupied(mut entry) => {
            entry.insert(value);
            entry.into_mut()
        }
        Entry::Vacant(entry) => entry.insert(value),
    }
}

/// An export together with its resolved ancestor values.
#[derive(Debug, Clone, Copy)]
pub struct ExportDescriptor<'a> {
    document: &'a Document,
    export: &'a Export,
    effective: Effective,
}

impl<'a> ExportDescriptor<'a> {
    /// Output path of the export.
    pub fn path(&self) -> &'a Path {
        &self.export.path
    }

    /// Path of the source document.
    pub fn document_path(&self) -> &'a Path {
        &self.document.path
    }

    pub fn crop(&self) -> Option<&'a Crop> {
        self.export.crop.as_ref()
    }

    /// Resize applied after cropping: the export's own, else the document's,
    /// else the schema's.
    pub fn resize(&self) -> Option<Resize> {
        self.effective.resize
    }

    /// Effective values at export level.
    pub fn effective(&self) -> &Effective {
        &self.effective
    }

    pub fn root(&self) -> &'a Group {
        &self.export.root
    }

    /// Resolved action/mask for the layer at `path`.
    pub fn get_layer<S: AsRef<str>>(&self, path: &[S]) -> Effective {
        self.export.root.get_layer(&self.effective, path)
    }
}
