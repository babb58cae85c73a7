//! Attachments and the manifests that list them.
//!
//! A manifest is supplied by whoever invokes us, either as a JSON or TOML
//! file, or implicitly as a single URL on the command line.

use schemars::JsonSchema;
use toml_span::{DeserError, de_helpers::TableHelper};

use crate::{loader::LoadError, prelude::*};

/// The attachment name we look for first.
pub const DEFAULT_ATTACHMENT_NAME: &str = "input.md";

/// A named, URI-addressed piece of content.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Attachment {
    /// The attachment's file name, such as `input.md`.
    pub name: String,

    /// Either a `data:` URL or an `http(s)` URL.
    pub url: String,
}

impl<'de> toml_span::Deserialize<'de> for Attachment {
    fn deserialize(value: &mut toml_span::Value<'de>) -> Result<Self, DeserError> {
        let mut th = TableHelper::new(value)?;
        let name = th.required("name")?;
        let url = th.required("url")?;
        th.finalize(None)?;
        Ok(Attachment { name, url })
    }
}

/// A list of attachments.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentManifest {
    /// Our attachments, in the order supplied.
    pub attachments: Vec<Attachment>,
}

impl<'de> toml_span::Deserialize<'de> for AttachmentManifest {
    fn deserialize(value: &mut toml_span::Value<'de>) -> Result<Self, DeserError> {
        let mut th = TableHelper::new(value)?;
        let attachments = th.required("attachments")?;
        th.finalize(None)?;
        Ok(AttachmentManifest { attachments })
    }
}

/// JSON manifests may also be a bare array of attachments.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonManifest {
    Table(AttachmentManifest),
    Array(Vec<Attachment>),
}

impl AttachmentManifest {
    /// A manifest containing a single URL, named [`DEFAULT_ATTACHMENT_NAME`].
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            attachments: vec![Attachment {
                name: DEFAULT_ATTACHMENT_NAME.to_owned(),
                url: url.into(),
            }],
        }
    }

    /// Parse a manifest from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let manifest: JsonManifest =
            serde_json::from_str(json).context("failed to parse JSON manifest")?;
        Ok(match manifest {
            JsonManifest::Table(manifest) => manifest,
            JsonManifest::Array(attachments) => Self { attachments },
        })
    }

    /// Parse a manifest from TOML.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let parse = || -> Result<Self, DeserError> {
            let mut value = toml_span::de::parse(toml_str)?;
            <Self as toml_span::Deserialize>::deserialize(&mut value)
        };
        parse().map_err(|err| {
            let msgs = err
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            anyhow!("failed to parse TOML manifest: {msgs}")
        })
    }

    /// Read a manifest from a `.json` or `.toml` file. Anything not ending in
    /// `.toml` is treated as JSON.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read manifest at path: {:?}", path))?;
        let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml_str(&data)
        } else {
            Self::from_json_str(&data)
        };
        let manifest = parsed
            .with_context(|| format!("Failed to load manifest at path: {:?}", path))?;
        debug!(count = manifest.attachments.len(), "Loaded manifest");
        Ok(manifest)
    }

    /// Find the Markdown attachment: the one called `name`, or else the first.
    pub fn markdown_attachment(&self, name: &str) -> Result<&Attachment, LoadError> {
        self.attachments
            .iter()
            .find(|att| att.name == name)
            .or_else(|| self.attachments.first())
            .ok_or(LoadError::NoAttachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn att(name: &str, url: &str) -> Attachment {
        Attachment {
            name: name.to_owned(),
            url: url.to_owned(),
        }
    }

    #[test]
    fn parses_json_table_and_array() {
        let table = r#"{"attachments": [{"name": "input.md", "url": "data:,hi"}]}"#;
        let array = r#"[{"name": "input.md", "url": "data:,hi"}]"#;
        let expected = AttachmentManifest {
            attachments: vec![att("input.md", "data:,hi")],
        };
        assert_eq!(AttachmentManifest::from_json_str(table).unwrap(), expected);
        assert_eq!(AttachmentManifest::from_json_str(array).unwrap(), expected);
    }

    #[test]
    fn rejects_json_with_missing_url() {
        assert!(AttachmentManifest::from_json_str(r#"[{"name": "x"}]"#).is_err());
    }

    #[test]
    fn parses_toml() {
        let manifest = AttachmentManifest::from_toml_str(
            r#"
[[attachments]]
name = "notes.txt"
url = "https://example.com/notes.txt"

[[attachments]]
name = "input.md"
url = "data:text/markdown;base64,aGVsbG8KIyBUaXRsZQ=="
"#,
        )
        .unwrap();
        assert_eq!(manifest.attachments.len(), 2);
        assert_eq!(manifest.attachments[1].name, "input.md");
    }

    #[test]
    fn rejects_toml_with_unknown_keys() {
        let err = AttachmentManifest::from_toml_str(
            r#"
[[attachments]]
name = "input.md"
url = "data:,hi"
size = 12
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to parse TOML manifest"));
    }

    #[tokio::test]
    async fn reads_manifest_files_by_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let json_path = dir.path().join("manifest.json");
        tokio::fs::write(&json_path, r#"[{"name": "a.md", "url": "data:,a"}]"#).await?;
        let toml_path = dir.path().join("manifest.toml");
        tokio::fs::write(
            &toml_path,
            "[[attachments]]\nname = \"a.md\"\nurl = \"data:,a\"\n",
        )
        .await?;

        let from_json = AttachmentManifest::from_path(&json_path).await?;
        let from_toml = AttachmentManifest::from_path(&toml_path).await?;
        assert_eq!(from_json, from_toml);
        Ok(())
    }

    #[test]
    fn picks_named_attachment_then_first() {
        let manifest = AttachmentManifest {
            attachments: vec![att("notes.txt", "data:,a"), att("input.md", "data:,b")],
        };
        assert_eq!(
            manifest.markdown_attachment(DEFAULT_ATTACHMENT_NAME).unwrap().url,
            "data:,b"
        );
        assert_eq!(
            manifest.markdown_attachment("missing.md").unwrap().url,
            "data:,a"
        );
    }

    #[test]
    fn empty_manifest_has_no_markdown_attachment() {
        let manifest = AttachmentManifest::default();
        assert!(matches!(
            manifest.markdown_attachment(DEFAULT_ATTACHMENT_NAME),
            Err(LoadError::NoAttachments)
        ));
    }

    #[test]
    fn single_url_manifest() {
        let manifest = AttachmentManifest::from_url("https://example.com/a.md");
        assert_eq!(
            manifest.attachments,
            vec![att(DEFAULT_ATTACHMENT_NAME, "https://example.com/a.md")]
        );
    }
}
