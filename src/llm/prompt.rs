/// System role for query generation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Instruction prepended to every question.
const INSTRUCTION: &str = "Use WikiPathways SPARQL Endpoint to retrieve the following information \
and make sure to include the necessary prefix lines in the generated SPARQL query.";

/// Prefixes the WikiPathways graph is usually queried with, offered to the
/// model so the generated prefix lines resolve.
pub const COMMON_PREFIXES: &[(&str, &str)] = &[
    ("wp", "http://vocabularies.wikipathways.org/wp#"),
    ("gpml", "http://vocabularies.wikipathways.org/gpml#"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Builds the prompt pair sent to the completion endpoint.
pub struct QueryPrompt {
    question: String,
    prefix_hint: bool,
}

impl QueryPrompt {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            prefix_hint: true,
        }
    }

    /// Leave the prefix table out, reproducing the bare instruction.
    pub fn without_prefix_hint(mut self) -> Self {
        self.prefix_hint = false;
        self
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    pub fn user_prompt(&self) -> String {
        let mut prompt = format!("{}\n{}", INSTRUCTION, self.question.trim());
        if self.prefix_hint {
            prompt.push_str("\n\nPrefixes commonly used in this graph:\n");
            for (prefix, iri) in COMMON_PREFIXES {
                prompt.push_str(&format!("PREFIX {prefix}: <{iri}>\n"));
            }
        }
        prompt
    }
}
