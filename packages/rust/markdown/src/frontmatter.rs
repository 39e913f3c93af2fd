//! Front matter splitting.
//!
//! A content file may open with a YAML block fenced by `---` lines. The
//! closing fence may also be `...`. Everything after the closing fence is
//! the body.

use serde_yaml::Value;

use deckbuilder_shared::{DeckBuilderError, Metadata, Result};

/// Split raw file text into its front matter entries and the remaining body.
///
/// Files without a complete front matter block yield empty metadata and the
/// whole text as body.
pub fn split(raw: &str) -> Result<(Metadata, String)> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let Some((yaml, body)) = fenced_block(text) else {
        return Ok((Metadata::new(), text.to_string()));
    };

    let metadata = parse_yaml(yaml)?;
    Ok((metadata, body.to_string()))
}

/// Locate the YAML between the opening and closing fences.
fn fenced_block(text: &str) -> Option<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');

    let first = lines.next()?;
    if !is_fence(first, false) {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_fence(line, true) {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }

    None
}

fn is_fence(line: &str, closing: bool) -> bool {
    let line = line.trim_end_matches(['\n', '\r']).trim_end();
    line == "---" || (closing && line == "...")
}

fn parse_yaml(yaml: &str) -> Result<Metadata> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| DeckBuilderError::render(format!("invalid front matter: {e}")))?;

    match value {
        Value::Null => Ok(Metadata::new()),
        Value::Mapping(map) => {
            let mut meta = Metadata::new();
            for (key, value) in map {
                meta.insert(scalar_to_string(&key)?, scalar_to_string(&value)?);
            }
            Ok(meta)
        }
        _ => Err(DeckBuilderError::render(
            "front matter must be a mapping of keys to values",
        )),
    }
}

/// Stringify a YAML value for use as an attribute. Scalars render bare;
/// sequences and mappings render as compact JSON.
fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value)
            .map_err(|e| DeckBuilderError::render(format!("unsupported front matter value: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_metadata_and_body() {
        let raw = "---\nlayout: center\nid: 42\n---\n# Title\n\nBody.\n";
        let (meta, body) = split(raw).unwrap();

        assert_eq!(meta.get("layout"), Some("center"));
        assert_eq!(meta.get("id"), Some("42"));
        assert_eq!(body, "# Title\n\nBody.\n");
    }

    #[test]
    fn keeps_key_order() {
        let raw = "---\nzeta: 1\nalpha: 2\nmid: 3\n---\nx";
        let (meta, _) = split(raw).unwrap();
        let keys: Vec<&str> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn no_front_matter() {
        let raw = "# Just markdown\n\n---\n\nwith a rule";
        let (meta, body) = split(raw).unwrap();
        assert!(meta.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn unterminated_block_is_body() {
        let raw = "---\ntitle: oops\n# heading\n";
        let (meta, body) = split(raw).unwrap();
        assert!(meta.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn empty_block() {
        let (meta, body) = split("---\n---\nBody").unwrap();
        assert!(meta.is_empty());
        assert_eq!(body, "Body");
    }

    #[test]
    fn dots_close_the_block() {
        let (meta, body) = split("---\na: b\n...\nBody").unwrap();
        assert_eq!(meta.get("a"), Some("b"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn crlf_and_bom() {
        let raw = "\u{feff}---\r\ndata-state: intro\r\n---\r\nHello\r\n";
        let (meta, body) = split(raw).unwrap();
        assert_eq!(meta.get("data-state"), Some("intro"));
        assert_eq!(body, "Hello\r\n");
    }

    #[test]
    fn scalar_values_stringify() {
        let raw = "---\nflag: true\nratio: 1.5\nnothing: ~\ntags: [a, b]\n---\n";
        let (meta, _) = split(raw).unwrap();
        assert_eq!(meta.get("flag"), Some("true"));
        assert_eq!(meta.get("ratio"), Some("1.5"));
        assert_eq!(meta.get("nothing"), Some(""));
        assert_eq!(meta.get("tags"), Some(r#"["a","b"]"#));
    }

    #[test]
    fn non_mapping_is_an_error() {
        let err = split("---\n- a\n- b\n---\nbody").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = split("---\nkey: [unclosed\n---\nbody").unwrap_err();
        assert!(matches!(err, DeckBuilderError::Render { .. }));
    }
}
