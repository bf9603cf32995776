//! Initial tree scan.
//!
//! Walks the rendered tree once and builds the graph: every element with a
//! model attribute becomes (or merges into) a model record, either at the
//! root or inside the collection of its nearest collection ancestor.
//! Collections capture their template the first time they are seen.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tripled_core::logging::targets;
use tripled_core::{Document, DomResult, NodeId};

use crate::config::BindingConfig;
use crate::record::{CollectionRecord, ModelRecord, PropertyMap, Template};

/// Tag of a template marker whose children, not itself, form the template.
const TEMPLATE_WRAPPER: &str = "template";

/// The graph produced by a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Collections by name, in discovery order.
    pub collections: IndexMap<String, CollectionRecord>,
    /// Root models by reference, in discovery order.
    pub models: IndexMap<String, ModelRecord>,
}

/// Scan `doc` and build the initial graph.
///
/// Template marker elements are removed from every collection container.
/// Anchors inside a template marker are not models.
#[tracing::instrument(skip_all, target = "tripled::scanner", level = "debug")]
pub fn scan(doc: &mut Document, config: &BindingConfig) -> DomResult<ScanResult> {
    let model_attribute = config.model_attribute();
    let collection_attribute = config.collection_attribute();
    let template_attribute = config.template_attribute();

    let mut result = ScanResult::default();
    let anchors = doc.find_descendants(doc.root(), |d, node| d.has_attribute(node, &model_attribute))?;

    for anchor in anchors {
        // Anchors inside an already captured template marker are gone.
        if !doc.is_attached(anchor) || in_template(doc, anchor, &template_attribute)? {
            tracing::trace!(target: targets::SCANNER, ?anchor, "skipping template anchor");
            continue;
        }
        let reference = match doc.attribute(anchor, &model_attribute) {
            Some(reference) if !reference.is_empty() => reference.to_string(),
            _ => {
                tracing::debug!(target: targets::SCANNER, ?anchor, "skipping anchor without reference");
                continue;
            }
        };
        let properties = collect_properties(doc, config, anchor)?;

        // An anchor is never a member of its own collection.
        let container = match doc.parent(anchor)? {
            Some(parent) => doc.closest(parent, |d, node| d.has_attribute(node, &collection_attribute))?,
            None => None,
        };

        let models = match container {
            Some(container) => {
                let name = doc
                    .attribute(container, &collection_attribute)
                    .unwrap_or_default()
                    .to_string();
                if name.is_empty() {
                    tracing::warn!(target: targets::SCANNER, %reference, "collection container has no name; anchor skipped");
                    continue;
                }
                let collection = register_container(doc, config, &mut result, name, container)?;
                collection.models_mut()
            }
            None => &mut result.models,
        };

        let record = models.entry(reference.clone()).or_default();
        record.merge(properties);
        record.push_element(anchor);
        tracing::trace!(target: targets::SCANNER, %reference, elements = record.elements().len(), "bound anchor");
    }

    // Containers without anchors still accept inserts.
    let containers = doc.find_descendants(doc.root(), |d, node| d.has_attribute(node, &collection_attribute))?;
    for container in containers {
        if !doc.is_attached(container) || in_template(doc, container, &template_attribute)? {
            continue;
        }
        let name = doc
            .attribute(container, &collection_attribute)
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }
        if let Some(collection) = result.collections.get_mut(&name) {
            discard_template_markers(doc, config, container)?;
            collection.add_container(container);
            continue;
        }
        let template = capture_template(doc, config, container)?;
        if template.is_empty() {
            tracing::debug!(target: targets::SCANNER, collection = %name, "empty container without template ignored");
            continue;
        }
        result.collections.insert(name, CollectionRecord::new(container, template));
    }

    tracing::debug!(
        target: targets::SCANNER,
        collections = result.collections.len(),
        models = result.models.len(),
        "scan complete"
    );
    Ok(result)
}

fn register_container<'r>(
    doc: &mut Document,
    config: &BindingConfig,
    result: &'r mut ScanResult,
    name: String,
    container: NodeId,
) -> DomResult<&'r mut CollectionRecord> {
    match result.collections.entry(name) {
        Entry::Occupied(entry) => {
            discard_template_markers(doc, config, container)?;
            let collection = entry.into_mut();
            collection.add_container(container);
            Ok(collection)
        }
        Entry::Vacant(entry) => {
            let template = capture_template(doc, config, container)?;
            tracing::debug!(
                target: targets::SCANNER,
                collection = %entry.key(),
                template = template.len(),
                "registered collection"
            );
            Ok(entry.insert(CollectionRecord::new(container, template)))
        }
    }
}

/// Capture the template of a collection container.
///
/// A direct child carrying the template attribute wins: it is cloned without
/// that attribute. A `<template>` wrapper contributes its child elements
/// instead. Every marker is then removed from the tree. Without a marker the
/// first child element is cloned.
pub fn capture_template(
    doc: &mut Document,
    config: &BindingConfig,
    container: NodeId,
) -> DomResult<Template> {
    let template_attribute = config.template_attribute();
    let markers = template_markers(doc, &template_attribute, container)?;

    if let Some(&marker) = markers.first() {
        let mut subtrees = Vec::new();
        if doc.tag_name(marker) == Some(TEMPLATE_WRAPPER) {
            for child in doc.child_elements(marker)? {
                subtrees.push(doc.deep_clone(child)?);
            }
        } else {
            let clone = doc.deep_clone(marker)?;
            doc.remove_attribute(clone, &template_attribute)?;
            subtrees.push(clone);
        }
        for marker in markers {
            doc.remove(marker)?;
        }
        return Ok(Template::new(subtrees));
    }

    match doc.first_element_child(container)? {
        Some(first) => Ok(Template::new(vec![doc.deep_clone(first)?])),
        None => Ok(Template::default()),
    }
}

/// Drop the markers of a container whose collection already has a template.
fn discard_template_markers(
    doc: &mut Document,
    config: &BindingConfig,
    container: NodeId,
) -> DomResult<()> {
    for marker in template_markers(doc, &config.template_attribute(), container)? {
        tracing::debug!(target: targets::SCANNER, ?container, "discarding extra template marker");
        doc.remove(marker)?;
    }
    Ok(())
}

fn template_markers(
    doc: &Document,
    template_attribute: &str,
    container: NodeId,
) -> DomResult<Vec<NodeId>> {
    Ok(doc
        .child_elements(container)?
        .into_iter()
        .filter(|&child| doc.has_attribute(child, template_attribute))
        .collect())
}

/// Text of every descendant of `anchor` with a property attribute.
pub fn collect_properties(
    doc: &Document,
    config: &BindingConfig,
    anchor: NodeId,
) -> DomResult<PropertyMap> {
    let property_attribute = config.property_attribute();
    let mut properties = PropertyMap::new();
    for node in doc.find_descendants(anchor, |d, node| d.has_attribute(node, &property_attribute))? {
        let name = doc.attribute(node, &property_attribute).unwrap_or_default();
        if name.is_empty() || name == crate::record::RESERVED_KEY {
            continue;
        }
        properties.insert(name.to_string(), doc.text_content(node)?);
    }
    Ok(properties)
}

fn in_template(doc: &Document, node: NodeId, template_attribute: &str) -> DomResult<bool> {
    Ok(doc
        .closest(node, |d, n| d.has_attribute(n, template_attribute))?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_markup(markup: &str) -> (Document, ScanResult) {
        let mut doc = Document::parse(markup).unwrap();
        let result = scan(&mut doc, &BindingConfig::default()).unwrap();
        (doc, result)
    }

    #[test]
    fn test_empty_document() {
        let (_, result) = scan_markup("<div><p>nothing bound</p></div>");
        assert!(result.collections.is_empty());
        assert!(result.models.is_empty());
    }

    #[test]
    fn test_root_model_properties() {
        let (_, result) = scan_markup(
            r#"<header td-model="header"><h1 td-property="title">Shop</h1><p td-property="motto">Cheap</p></header>"#,
        );
        let header = &result.models["header"];
        assert_eq!(header.get("title"), Some("Shop"));
        assert_eq!(header.get("motto"), Some("Cheap"));
        assert_eq!(header.elements().len(), 1);
    }

    #[test]
    fn test_duplicate_anchors_merge() {
        let (_, result) = scan_markup(
            r#"<div>
                <p td-model="m"><b td-property="a">1</b><i td-property="b">2</i></p>
                <p td-model="m"><b td-property="a">9</b></p>
            </div>"#,
        );
        assert_eq!(result.models.len(), 1);
        let m = &result.models["m"];
        assert_eq!(m.get("a"), Some("9"));
        assert_eq!(m.get("b"), Some("2"));
        assert_eq!(m.elements().len(), 2);
    }

    #[test]
    fn test_collection_with_first_child_template() {
        let (doc, result) = scan_markup(
            r#"<ul td-collection="items">
                <li td-model="a"><span td-property="title">A</span></li>
                <li td-model="b"><span td-property="title">B</span></li>
            </ul>"#,
        );
        let items = &result.collections["items"];
        assert_eq!(items.len(), 2);
        assert_eq!(items.get("b").unwrap().get("title"), Some("B"));
        assert_eq!(items.elements().len(), 1);
        assert_eq!(items.template().len(), 1);

        let template = items.template().subtrees()[0];
        assert!(!doc.is_attached(template));
        assert_eq!(doc.attribute(template, "td-model"), Some("a"));
        assert!(result.models.is_empty());
    }

    #[test]
    fn test_template_marker_removed() {
        let (doc, result) = scan_markup(
            r#"<ul td-collection="items"><template td-template="yes"><li td-model="{{ref}}"><span td-property="title"/></li><li class="sep"/></template><li td-model="a"><span td-property="title">A</span></li></ul>"#,
        );
        let items = &result.collections["items"];
        assert_eq!(items.template().len(), 2);
        assert_eq!(items.len(), 1);
        assert!(!items.contains_key("{{ref}}"));
        assert!(!doc.to_markup().contains("td-template"));
    }

    #[test]
    fn test_marked_child_is_the_template() {
        let (doc, result) = scan_markup(
            r#"<ul td-collection="items"><li td-template="" class="row"><span td-property="title"/></li><li td-model="a"><span td-property="title">A</span></li></ul>"#,
        );
        let items = &result.collections["items"];
        assert_eq!(items.template().len(), 1);

        let template = items.template().subtrees()[0];
        assert!(!doc.is_attached(template));
        assert_eq!(
            doc.node_markup(template).unwrap(),
            r#"<li class="row"><span td-property="title"/></li>"#
        );
        assert_eq!(
            doc.to_markup(),
            r#"<ul td-collection="items"><li td-model="a"><span td-property="title">A</span></li></ul>"#
        );
    }

    #[test]
    fn test_second_container_marker_removed() {
        let (doc, result) = scan_markup(
            r#"<div><ul td-collection="items"><li td-model="a"/></ul><ol td-collection="items"><li td-template=""><i td-model="ghost"/></li></ol></div>"#,
        );
        let items = &result.collections["items"];
        assert_eq!(items.elements().len(), 2);
        assert!(!items.contains_key("ghost"));
        assert!(result.models.is_empty());
        assert_eq!(
            doc.to_markup(),
            r#"<div><ul td-collection="items"><li td-model="a"/></ul><ol td-collection="items"/></div>"#
        );
    }

    #[test]
    fn test_container_shared_across_anchors_listed_once() {
        let (doc, result) = scan_markup(
            r#"<div>
                <ul td-collection="items"><li td-model="a"/><li td-model="b"/></ul>
                <ol td-collection="items"><li td-model="a"/></ol>
            </div>"#,
        );
        let items = &result.collections["items"];
        assert_eq!(items.elements().len(), 2);
        assert_eq!(items.get("a").unwrap().elements().len(), 2);
        assert_eq!(doc.tag_name(items.elements()[1]), Some("ol"));
    }

    #[test]
    fn test_empty_container_with_template_registered() {
        let (_, result) = scan_markup(
            r#"<ul td-collection="todo"><template td-template=""><li><span td-property="text"/></li></template></ul><ul td-collection="bare"/>"#,
        );
        assert!(result.collections.contains_key("todo"));
        assert!(result.collections["todo"].is_empty());
        assert!(!result.collections.contains_key("bare"));
    }

    #[test]
    fn test_anchor_is_not_its_own_collection() {
        let (_, result) = scan_markup(r#"<div td-collection="c" td-model="m"><b td-property="x">1</b></div>"#);
        assert!(result.models.contains_key("m"));
        assert!(!result.collections.get("c").is_some_and(|c| c.contains_key("m")));
    }
}
