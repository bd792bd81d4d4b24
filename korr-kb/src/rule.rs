use crate::error::KbError;

/// One hyperalert rule, loaded from `<gid>-<sid>-<rev>.xml` (spec.md
/// §4.6): a description and the raw (unbound) pre/post predicate
/// templates, still carrying `+SRC_ADDR+`-style macros.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub desc: String,
    pub pre: Vec<String>,
    pub post: Vec<String>,
}

pub fn parse_rule_xml(content: &str, path: &str) -> Result<Rule, KbError> {
    let doc = roxmltree::Document::parse(content).map_err(|e| KbError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "hyperalert" {
        return Err(KbError::Malformed {
            path: path.to_string(),
            reason: format!("expected root element <hyperalert>, found <{}>", root.tag_name().name()),
        });
    }

    let desc = root
        .children()
        .find(|n| n.tag_name().name() == "desc")
        .and_then(|n| n.text())
        .unwrap_or("")
        .trim()
        .to_string();

    let collect = |tag: &str| -> Vec<String> {
        root.children()
            .filter(|n| n.tag_name().name() == tag)
            .filter_map(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    };

    Ok(Rule {
        desc,
        pre: collect("pre"),
        post: collect("post"),
    })
}
