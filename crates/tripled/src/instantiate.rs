//! Template instantiation.

use tripled_core::logging::targets;
use tripled_core::{Document, DomResult, NodeId};

use crate::config::BindingConfig;
use crate::observe::find_property;
use crate::record::{PropertyMap, Template};

/// Clone every template subtree into `container` for the model `reference`.
///
/// Each clone is tagged with the model attribute, gets its bound properties
/// filled in and has the placeholder token replaced by the reference before
/// it is appended. Returns the clones in template order. On error, clones made
/// by this call are destroyed before the error is returned.
pub(crate) fn instantiate(
    doc: &mut Document,
    config: &BindingConfig,
    container: NodeId,
    template: &Template,
    reference: &str,
    properties: &PropertyMap,
) -> DomResult<Vec<NodeId>> {
    let mut clones = Vec::with_capacity(template.len());
    let result = instantiate_into(doc, config, container, template, reference, properties, &mut clones);
    if let Err(e) = result {
        for clone in clones {
            let _ = doc.remove(clone);
        }
        return Err(e);
    }

    tracing::trace!(
        target: targets::INSTANTIATE,
        ?container,
        %reference,
        clones = clones.len(),
        "instantiated template"
    );
    Ok(clones)
}

fn instantiate_into(
    doc: &mut Document,
    config: &BindingConfig,
    container: NodeId,
    template: &Template,
    reference: &str,
    properties: &PropertyMap,
    clones: &mut Vec<NodeId>,
) -> DomResult<()> {
    let model_attribute = config.model_attribute();
    for &subtree in template.subtrees() {
        let clone = doc.deep_clone(subtree)?;
        clones.push(clone);
        doc.set_attribute(clone, model_attribute.as_str(), reference)?;
        for (key, value) in properties {
            if let Some(target) = find_property(doc, config, clone, key)? {
                doc.set_text_content(target, value.as_str())?;
            }
        }
        doc.replace_text(clone, &config.placeholder, reference)?;
        doc.append_child(container, clone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::properties;

    fn template_from(doc: &mut Document, markup: &str) -> Template {
        let source = Document::parse(markup).unwrap();
        let subtrees = source
            .child_elements(source.root())
            .unwrap()
            .into_iter()
            .map(|element| copy_into(doc, &source, element))
            .collect();
        Template::new(subtrees)
    }

    fn copy_into(doc: &mut Document, from: &Document, node: NodeId) -> NodeId {
        match from.kind(node).unwrap() {
            tripled_core::NodeKind::Element { name, attributes } => {
                let element = doc.create_element(name.clone());
                for (key, value) in attributes {
                    doc.set_attribute(element, key.clone(), value.clone()).unwrap();
                }
                for &child in from.children(node).unwrap() {
                    let child = copy_into(doc, from, child);
                    doc.append_child(element, child).unwrap();
                }
                element
            }
            tripled_core::NodeKind::Text(text) => doc.create_text(text.clone()),
            _ => doc.create_comment(""),
        }
    }

    #[test]
    fn test_clone_binds_properties_and_placeholder() {
        let mut doc = Document::parse(r#"<ul td-collection="items"/>"#).unwrap();
        let container = doc.first_element_child(doc.root()).unwrap().unwrap();
        let template = template_from(
            &mut doc,
            r#"<li id="item-{{ref}}"><span td-property="title"/><em>#{{ref}}</em></li>"#,
        );

        let clones = instantiate(
            &mut doc,
            &BindingConfig::default(),
            container,
            &template,
            "a",
            &properties([("title", "Foo"), ("missing", "x")]),
        )
        .unwrap();

        assert_eq!(clones.len(), 1);
        assert_eq!(
            doc.to_markup(),
            r#"<ul td-collection="items"><li id="item-a" td-model="a"><span td-property="title">Foo</span><em>#a</em></li></ul>"#
        );
    }

    #[test]
    fn test_template_left_untouched() {
        let mut doc = Document::parse(r#"<ul td-collection="items"/>"#).unwrap();
        let container = doc.first_element_child(doc.root()).unwrap().unwrap();
        let template = template_from(&mut doc, r#"<li><b td-property="n">{{ref}}</b></li><hr/>"#);
        let before: Vec<String> = template
            .subtrees()
            .iter()
            .map(|&t| doc.node_markup(t).unwrap())
            .collect();

        let clones = instantiate(
            &mut doc,
            &BindingConfig::default(),
            container,
            &template,
            "x",
            &properties([("n", "1")]),
        )
        .unwrap();

        assert_eq!(clones.len(), 2);
        let after: Vec<String> = template
            .subtrees()
            .iter()
            .map(|&t| doc.node_markup(t).unwrap())
            .collect();
        assert_eq!(before, after);
        assert!(!doc.is_attached(template.subtrees()[0]));
    }

    #[test]
    fn test_invalid_container_leaves_no_clones() {
        let mut doc = Document::new();
        let container = doc.create_element("ul");
        doc.remove(container).unwrap();
        let template = template_from(&mut doc, "<li/>");
        let count = doc.node_count();

        let result = instantiate(
            &mut doc,
            &BindingConfig::default(),
            container,
            &template,
            "a",
            &properties([("k", "v")]),
        );
        assert!(result.is_err());
        assert_eq!(doc.node_count(), count);
    }
}
