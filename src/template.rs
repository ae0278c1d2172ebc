//! Release-artifact URL templates.
//!
//! A template is parsed once when the configuration is loaded; rendering is a
//! plain substitution that cannot fail.

use reqwest::Url;
use semver::Version;

use crate::error::ConfigError;
use crate::platform::PlatformDescriptor;

pub const DEFAULT_HOST: &str = "github.com";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://{host}/{repository}/releases/download/v{version}/{name}-v{version}-{target}.tar.gz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Host,
    Repository,
    Name,
    Version,
    Target,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "host" => Some(Field::Host),
            "repository" => Some(Field::Repository),
            "name" => Some(Field::Name),
            "version" => Some(Field::Version),
            "target" => Some(Field::Target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// The package-level values substituted into every URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageVars {
    pub host: String,
    pub repository: Option<String>,
    pub name: String,
}

/// Version and platform of one artifact.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseCoordinates<'a> {
    pub version: &'a Version,
    pub platform: &'a PlatformDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseTemplate {
    source: String,
    segments: Vec<Segment>,
    vars: PackageVars,
}

impl ReleaseTemplate {
    pub fn new(template: &str, vars: PackageVars) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        let segments = parse_segments(template).map_err(invalid)?;

        if vars.repository.is_none() && segments.contains(&Segment::Field(Field::Repository)) {
            return Err(invalid(
                "uses {repository} but the manifest has no `repository`".to_string(),
            ));
        }
        if !segments.contains(&Segment::Field(Field::Target)) {
            return Err(invalid("must contain {target}".to_string()));
        }

        let parsed = Self {
            source: template.to_string(),
            segments,
            vars,
        };

        let sample = parsed.render_with("0.0.0", "x86_64-linux");
        match Url::parse(&sample) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(parsed),
            Ok(url) => Err(invalid(format!("unsupported URL scheme `{}`", url.scheme()))),
            Err(e) => Err(invalid(format!("does not render to a URL ({})", e))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compute the download URL for an artifact.
    pub fn render(&self, coords: ReleaseCoordinates<'_>) -> String {
        self.render_with(&coords.version.to_string(), coords.platform.target_triple)
    }

    fn render_with(&self, version: &str, target: &str) -> String {
        let mut url = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Field(Field::Host) => url.push_str(&self.vars.host),
                Segment::Field(Field::Repository) => {
                    url.push_str(self.vars.repository.as_deref().unwrap_or_default())
                }
                Segment::Field(Field::Name) => url.push_str(&self.vars.name),
                Segment::Field(Field::Version) => url.push_str(version),
                Segment::Field(Field::Target) => url.push_str(target),
            }
        }
        url
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(format!("unclosed `{{` at offset {}", pos));
                }
                let field = Field::parse(&name)
                    .ok_or_else(|| format!("unknown placeholder {{{}}}", name))?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(field));
            }
            '}' => return Err(format!("unmatched `}}` at offset {}", pos)),
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
