/// Front-matter documents: a YAML header between `---` lines, then Markdown.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("{0} must be a valid FrontMatter file")]
    NotFrontMatter(String),
    #[error("invalid YAML header in {name}: {source}")]
    Yaml {
        name: String,
        source: serde_yaml::Error,
    },
}

/// A decoded front-matter document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The YAML header as JSON. An empty header decodes to `Null`.
    pub header: serde_json::Value,
    /// Trimmed Markdown body.
    pub body: String,
}

/// Split `content` into header and body. `name` is only used in errors.
pub fn split(name: &str, content: &str) -> Result<Document, FrontMatterError> {
    let not_front_matter = || FrontMatterError::NotFrontMatter(name.to_string());

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return Err(not_front_matter()),
    }

    let mut header = String::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        header.push_str(line);
    }
    if !closed {
        return Err(not_front_matter());
    }
    let body: String = lines.collect();

    let header = if header.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_yaml::from_str(&header).map_err(|source| FrontMatterError::Yaml {
            name: name.to_string(),
            source,
        })?
    };

    Ok(Document {
        header,
        body: body.trim().to_string(),
    })
}
