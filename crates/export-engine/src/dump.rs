//! Dump the currently visible layer tree as a `show:` rule list.
//!
//! The output is a starting point for an export rule: paste it under an
//! export with `default: hide` to reproduce what the document shows now.

use layercut_common::{LayercutError, LayercutResult};
use layercut_schema::{GroupRule, RuleNode, Rules};
use serde::Serialize;

use crate::document::{Document, LayerId};

/// Top-level `show:` list of visible layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleTree {
    pub show: Rules,
}

impl VisibleTree {
    pub fn to_yaml(&self) -> LayercutResult<String> {
        serde_yaml::to_string(self).map_err(|e| LayercutError::document(e.to_string()))
    }
}

/// Visible leaves by name and visible groups as `{group, show}` nodes.
/// Hidden groups are not descended into; groups with nothing visible inside
/// are left out.
pub fn dump_visible_tree<D>(document: &D) -> LayercutResult<VisibleTree>
where
    D: Document + ?Sized,
{
    Ok(VisibleTree {
        show: Rules::Many(visible_nodes(document, document.layers())?),
    })
}

fn visible_nodes<D>(document: &D, layers: Vec<LayerId>) -> LayercutResult<Vec<RuleNode>>
where
    D: Document + ?Sized,
{
    let mut nodes = Vec::new();
    for id in layers {
        let info = document.info(id)?;
        if !info.visible {
            continue;
        }
        if info.is_group {
            let children = visible_nodes(document, document.children(id))?;
            if children.is_empty() {
                continue;
            }
            let mut rule = GroupRule::new(info.name);
            rule.show = Some(Rules::Many(children));
            nodes.push(RuleNode::Group(rule));
        } else {
            nodes.push(RuleNode::Name(info.name));
        }
    }
    Ok(nodes)
}
