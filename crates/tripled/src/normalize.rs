//! Attribute alias normalization.
//!
//! Markup may use `data-td-*` attributes instead of `td-*`. The normalizer
//! rewrites the aliases in place so the scanner only has to look for one name.

use tripled_core::logging::targets;
use tripled_core::{Document, DomResult};

use crate::config::{BindingConfig, Subject};

/// Rewrite every non-empty `data-<ns>-<subject>` attribute into
/// `<ns>-<subject>` and drop the alias.
///
/// Returns the number of attributes rewritten.
pub fn normalize(doc: &mut Document, config: &BindingConfig) -> DomResult<usize> {
    let elements: Vec<_> = doc
        .descendants(doc.root())?
        .into_iter()
        .filter(|&node| doc.is_element(node))
        .collect();

    let mut rewritten = 0;
    for subject in Subject::ALL {
        let alias = config.alias(subject);
        let canonical = config.attribute(subject);
        for &element in &elements {
            let value = match doc.attribute(element, &alias) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => continue,
            };
            doc.set_attribute(element, canonical.as_str(), value)?;
            doc.remove_attribute(element, &alias)?;
            rewritten += 1;
        }
    }

    tracing::debug!(target: targets::NORMALIZE, rewritten, "normalized attribute aliases");
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_rewritten() {
        let mut doc = Document::parse(
            r#"<ul data-td-collection="items"><li data-td-model="a"><b data-td-property="title">A</b></li></ul>"#,
        )
        .unwrap();

        let count = normalize(&mut doc, &BindingConfig::default()).unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            doc.to_markup(),
            r#"<ul td-collection="items"><li td-model="a"><b td-property="title">A</b></li></ul>"#
        );
    }

    #[test]
    fn test_canonical_and_empty_alias_untouched() {
        let source = r#"<div td-model="x"><p data-td-property="">y</p></div>"#;
        let mut doc = Document::parse(source).unwrap();

        assert_eq!(normalize(&mut doc, &BindingConfig::default()).unwrap(), 0);
        assert_eq!(doc.to_markup(), source);
    }

    #[test]
    fn test_custom_namespace() {
        let mut doc = Document::parse(r#"<p data-bind-model="m" data-td-model="n"/>"#).unwrap();
        let config = BindingConfig {
            namespace: "bind".into(),
            ..Default::default()
        };

        assert_eq!(normalize(&mut doc, &config).unwrap(), 1);
        let p = doc.first_element_child(doc.root()).unwrap().unwrap();
        assert_eq!(doc.attribute(p, "bind-model"), Some("m"));
        assert_eq!(doc.attribute(p, "data-td-model"), Some("n"));
    }
}
