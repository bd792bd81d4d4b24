use crate::error::ManualError;
use korr_core::AlertTypeKey;

/// A single force-correlate or force-uncorrelate directive between two
/// alert types (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualPair {
    pub from: AlertTypeKey,
    pub to: AlertTypeKey,
}

fn parse_key(node: roxmltree::Node, tag: &str, path: &str) -> Result<AlertTypeKey, ManualError> {
    let elem = node
        .children()
        .find(|n| n.tag_name().name() == tag)
        .ok_or_else(|| ManualError::Malformed {
            path: path.to_string(),
            reason: format!("<correlation> is missing its <{tag}> element"),
        })?;

    let attr = |name: &str| -> Result<u32, ManualError> {
        elem.attribute(name)
            .ok_or_else(|| ManualError::Malformed {
                path: path.to_string(),
                reason: format!("<{tag}> is missing the \"{name}\" attribute"),
            })?
            .parse::<u32>()
            .map_err(|_| ManualError::Malformed {
                path: path.to_string(),
                reason: format!("<{tag}> attribute \"{name}\" is not a valid integer"),
            })
    };

    Ok(AlertTypeKey::new(attr("gid")?, attr("sid")?, attr("rev")?))
}

/// Parse a `<correlations>` document (spec.md §4.10's schema) into one
/// [`ManualPair`] per `<correlation>` element.
pub fn parse_pairs_xml(content: &str, path: &str) -> Result<Vec<ManualPair>, ManualError> {
    let doc = roxmltree::Document::parse(content).map_err(|e| ManualError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "correlations" {
        return Err(ManualError::Malformed {
            path: path.to_string(),
            reason: format!("expected root element <correlations>, found <{}>", root.tag_name().name()),
        });
    }

    root.children()
        .filter(|n| n.tag_name().name() == "correlation")
        .map(|n| {
            Ok(ManualPair {
                from: parse_key(n, "from", path)?,
                to: parse_key(n, "to", path)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_correlation_pairs() {
        let xml = r#"
            <correlations>
                <correlation>
                    <from gid="1" sid="1000" rev="1"/>
                    <to gid="1" sid="1001" rev="1"/>
                </correlation>
                <correlation>
                    <from gid="1" sid="2000" rev="2"/>
                    <to gid="1" sid="2001" rev="2"/>
                </correlation>
            </correlations>
        "#;
        let pairs = parse_pairs_xml(xml, "manual_correlations.xml").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].from, AlertTypeKey::new(1, 1000, 1));
        assert_eq!(pairs[0].to, AlertTypeKey::new(1, 1001, 1));
    }

    #[test]
    fn missing_attribute_is_malformed() {
        let xml = r#"
            <correlations>
                <correlation>
                    <from gid="1" sid="1000" rev="1"/>
                    <to gid="1" sid="1001"/>
                </correlation>
            </correlations>
        "#;
        assert!(parse_pairs_xml(xml, "bad.xml").is_err());
    }

    #[test]
    fn wrong_root_element_is_malformed() {
        assert!(parse_pairs_xml("<not-correlations/>", "bad.xml").is_err());
    }

    #[test]
    fn empty_document_yields_empty_list() {
        let pairs = parse_pairs_xml("<correlations></correlations>", "empty.xml").unwrap();
        assert!(pairs.is_empty());
    }
}
