//! Naming of addresses in the IPAM backend.
//!
//! An `IpAddress` is registered under `spec.name` when set, otherwise under
//! a name rendered from the configured template. Templates use Go-template
//! style placeholders: `{{.Tag}}`, `{{.Namespace}}` and `{{.Name}}`.
//!
//! Templates are parsed once when the controller starts. Anything that could
//! make rendering fail is rejected there, so rendering itself cannot fail.

use crate::error::ControllerError;
use crds::IpAddress;
use regex::Regex;
use std::sync::LazyLock;

/// Template used when none is configured
pub const DEFAULT_NAME_TEMPLATE: &str = "{{.Tag}}-{{.Namespace}}-{{.Name}}";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Tag,
    Namespace,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Values a template can refer to
#[derive(Debug, Clone, Copy)]
pub struct NameInput<'a> {
    pub tag: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
}

/// A parsed and validated name template
#[derive(Debug, Clone)]
pub struct NameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// Parse `source`, rejecting unknown placeholders and stray braces.
    pub fn parse(source: &str) -> Result<Self, ControllerError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(ident)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            push_literal(&mut segments, source, &source[last..whole.start()])?;

            let field = match ident.as_str() {
                "Tag" => Field::Tag,
                "Namespace" => Field::Namespace,
                "Name" => Field::Name,
                other => {
                    return Err(ControllerError::Configuration(format!(
                        "name template '{}' uses unknown field '.{}' (expected .Tag, .Namespace or .Name)",
                        source, other
                    )));
                }
            };
            segments.push(Segment::Field(field));
            last = whole.end();
        }

        push_literal(&mut segments, source, &source[last..])?;

        if segments.is_empty() {
            return Err(ControllerError::Configuration("name template is empty".to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Template text as configured
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template
    pub fn render(&self, input: &NameInput<'_>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Field(Field::Tag) => input.tag,
                Segment::Field(Field::Namespace) => input.namespace,
                Segment::Field(Field::Name) => input.name,
            })
            .collect()
    }
}

fn push_literal(segments: &mut Vec<Segment>, source: &str, text: &str) -> Result<(), ControllerError> {
    if text.contains("{{") || text.contains("}}") {
        return Err(ControllerError::Configuration(format!(
            "name template '{}' has an unterminated or malformed action near '{}'",
            source, text
        )));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

/// Derives the IPAM-facing name of a resource
#[derive(Debug, Clone)]
pub struct NameResolver {
    tag: String,
    template: NameTemplate,
}

impl NameResolver {
    /// Create a resolver for `tag` using `template`
    pub fn new(tag: impl Into<String>, template: NameTemplate) -> Self {
        Self {
            tag: tag.into(),
            template,
        }
    }

    /// Name the address of `ip` is registered under.
    ///
    /// An explicit `spec.name` wins over the template.
    pub fn name_for(&self, ip: &IpAddress) -> String {
        if !ip.spec.name.is_empty() {
            return ip.spec.name.clone();
        }

        self.template.render(&NameInput {
            tag: &self.tag,
            namespace: ip.metadata.namespace.as_deref().unwrap_or_default(),
            name: ip.metadata.name.as_deref().unwrap_or_default(),
        })
    }
}
