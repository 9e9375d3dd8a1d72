use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::core::error::{PathquillError, Result};
use crate::utils::dedent;

lazy_static! {
    // First fenced block tagged `sparql`, any case, closed by the next fence.
    static ref SPARQL_FENCE: Regex =
        Regex::new(r"(?is)```[ \t]*sparql[ \t]*\r?\n(.*?)```").unwrap();
}

/// Pulls the fenced SPARQL query out of a model reply. A reply without a
/// ```sparql fence is an error the surfaces show verbatim.
pub fn extract_sparql(reply: &str) -> Result<String> {
    let captures = SPARQL_FENCE.captures(reply).ok_or_else(|| {
        PathquillError::Extraction("SPARQL block not found in the response".to_string())
    })?;

    let query = dedent(&captures[1]).trim().to_string();
    if query.is_empty() {
        return Err(PathquillError::Extraction(
            "fenced SPARQL block is empty".to_string(),
        ));
    }

    debug!("SPARQL query extracted ({} chars)", query.len());
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_block() {
        let reply = "Here you go:\n```sparql\nSELECT ?p WHERE { ?p a wp:Pathway }\n```\nHope that helps!";
        assert_eq!(
            extract_sparql(reply).unwrap(),
            "SELECT ?p WHERE { ?p a wp:Pathway }"
        );
    }

    #[test]
    fn test_tag_case_is_ignored() {
        let reply = "```SPARQL\nASK { ?s ?p ?o }\n```";
        assert_eq!(extract_sparql(reply).unwrap(), "ASK { ?s ?p ?o }");
    }

    #[test]
    fn test_indented_block_is_dedented() {
        let reply = "```sparql\n    SELECT ?title\n    WHERE { ?p dcterms:title ?title }\n```";
        assert_eq!(
            extract_sparql(reply).unwrap(),
            "SELECT ?title\nWHERE { ?p dcterms:title ?title }"
        );
    }

    #[test]
    fn test_missing_fence_is_an_error() {
        let err = extract_sparql("SELECT ?s WHERE { ?s ?p ?o }").unwrap_err();
        assert!(matches!(err, PathquillError::Extraction(_)));
        assert!(err.to_string().contains("SPARQL block not found"));
    }

    #[test]
    fn test_untagged_fence_is_an_error() {
        let reply = "```\nSELECT ?s WHERE { ?s ?p ?o }\n```";
        assert!(extract_sparql(reply).is_err());
    }

    #[test]
    fn test_empty_block_is_an_error() {
        let err = extract_sparql("```sparql\n   \n```").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_first_of_multiple_blocks_wins() {
        let reply = "```sparql\nSELECT ?a WHERE { ?a ?b ?c }\n```\nor maybe\n```sparql\nSELECT ?x WHERE { ?x ?y ?z }\n```";
        assert_eq!(
            extract_sparql(reply).unwrap(),
            "SELECT ?a WHERE { ?a ?b ?c }"
        );
    }

    #[test]
    fn test_prose_with_multiline_query() {
        let reply = concat!(
            "Sure! The query below lists pathway titles.\n\n",
            "```sparql\n",
            "PREFIX wp: <http://vocabularies.wikipathways.org/wp#>\n",
            "PREFIX dcterms: <http://purl.org/dc/terms/>\n",
            "SELECT ?pathway ?title\n",
            "WHERE {\n",
            "  ?pathway a wp:Pathway ;\n",
            "           dcterms:title ?title .\n",
            "}\n",
            "```\n",
            "Let me know if you need filtering."
        );
        let query = extract_sparql(reply).unwrap();
        assert!(query.starts_with("PREFIX wp:"));
        assert!(query.ends_with("}"));
        assert!(query.contains("dcterms:title ?title"));
    }
}
