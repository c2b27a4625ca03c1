//! Content fingerprints.
//!
//! Every input is length-prefixed so that no two distinct input tuples hash
//! the same byte stream. Line endings are normalised to LF first; time and
//! absolute paths never enter a fingerprint.

use sha2::{Digest, Sha256};

use gqlet_codegen::Schema;
use gqlet_core::{Fingerprint, GenerateOptions};

const DOCUMENT_TAG: &str = "gqlet-document-v1";
const SCHEMA_TAG: &str = "gqlet-schema-v1";
const SCHEMA_DECLARATION_TAG: &str = "gqlet-schema-declaration-v1";

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Fingerprint of one document under a given schema and option set.
pub fn fingerprint(
    content: &str,
    schema_fingerprint: &Fingerprint,
    options: &GenerateOptions,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, DOCUMENT_TAG.as_bytes());
    update_field(&mut hasher, normalize(content).as_bytes());
    update_field(&mut hasher, schema_fingerprint.as_str().as_bytes());
    update_field(&mut hasher, options.canonical_json().as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Fingerprint of a schema: its files in path order, path and content each.
pub fn schema_fingerprint(schema: &Schema) -> Fingerprint {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, SCHEMA_TAG.as_bytes());
    for source in schema.sources() {
        update_field(&mut hasher, source.path.as_str().as_bytes());
        update_field(&mut hasher, normalize(&source.content).as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Fingerprint of a schema's declaration artifact under an option set.
pub fn schema_declaration_fingerprint(
    schema_fingerprint: &Fingerprint,
    options: &GenerateOptions,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, SCHEMA_DECLARATION_TAG.as_bytes());
    update_field(&mut hasher, schema_fingerprint.as_str().as_bytes());
    update_field(&mut hasher, options.canonical_json().as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlet_codegen::SchemaSource;
    use gqlet_core::{DocumentPath, SchemaName};

    fn schema(files: &[(&str, &str)]) -> Schema {
        let sources = files
            .iter()
            .map(|(p, c)| SchemaSource {
                path: DocumentPath::from(*p),
                content: c.to_string(),
            })
            .collect();
        Schema::parse(SchemaName::default_schema(), sources).unwrap()
    }

    fn fp(hex: &str) -> Fingerprint {
        Fingerprint(hex.to_string())
    }

    #[test]
    fn deterministic_and_hex() {
        let opts = GenerateOptions::default();
        let a = fingerprint("query Q { a }", &fp("s"), &opts);
        let b = fingerprint("query Q { a }", &fp("s"), &opts);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn each_input_changes_the_result() {
        let opts = GenerateOptions::default();
        let base = fingerprint("query Q { a }", &fp("s1"), &opts);
        assert_ne!(base, fingerprint("query Q { b }", &fp("s1"), &opts));
        assert_ne!(base, fingerprint("query Q { a }", &fp("s2"), &opts));
        let indexed = GenerateOptions {
            use_index_signature: true,
            ..GenerateOptions::default()
        };
        assert_ne!(base, fingerprint("query Q { a }", &fp("s1"), &indexed));
    }

    #[test]
    fn crlf_and_lf_agree() {
        let opts = GenerateOptions::default();
        assert_eq!(
            fingerprint("query Q {\r\n a\r\n}", &fp("s"), &opts),
            fingerprint("query Q {\n a\n}", &fp("s"), &opts)
        );
    }

    #[test]
    fn length_prefix_prevents_boundary_collisions() {
        let opts = GenerateOptions::default();
        assert_ne!(
            fingerprint("ab", &fp("c"), &opts),
            fingerprint("a", &fp("bc"), &opts)
        );
    }

    #[test]
    fn schema_declaration_fingerprint_tracks_schema_and_options() {
        let opts = GenerateOptions::default();
        let indexed = GenerateOptions {
            use_index_signature: true,
            ..GenerateOptions::default()
        };
        let base = schema_declaration_fingerprint(&fp("s1"), &opts);
        assert_eq!(base, schema_declaration_fingerprint(&fp("s1"), &opts));
        assert_ne!(base, schema_declaration_fingerprint(&fp("s2"), &opts));
        assert_ne!(base, schema_declaration_fingerprint(&fp("s1"), &indexed));
        assert_ne!(base, fingerprint("", &fp("s1"), &opts));
    }

    #[test]
    fn schema_fingerprint_tracks_paths_and_content() {
        let base = schema_fingerprint(&schema(&[("a.graphqls", "type Query { a: Int }")]));
        let renamed = schema_fingerprint(&schema(&[("b.graphqls", "type Query { a: Int }")]));
        let edited = schema_fingerprint(&schema(&[("a.graphqls", "type Query { a: String }")]));
        assert_ne!(base, renamed);
        assert_ne!(base, edited);

        let split = schema(&[
            ("b.graphqls", "type B { x: Int }"),
            ("a.graphqls", "type Query { b: B }"),
        ]);
        let reordered = schema(&[
            ("a.graphqls", "type Query { b: B }"),
            ("b.graphqls", "type B { x: Int }"),
        ]);
        assert_eq!(schema_fingerprint(&split), schema_fingerprint(&reordered));
    }
}
