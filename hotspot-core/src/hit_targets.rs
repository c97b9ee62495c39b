/// Declarative mesh-name to URL table for clickable hotspots
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

/// One clickable hotspot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitTarget {
    /// Name label of the mesh in the loaded model
    pub name: String,
    /// Destination opened in a new browsing context
    pub url: String,
}

impl HitTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        let reject = |reason: &str| {
            Err(ViewerError::HitTarget {
                name: self.name.clone(),
                reason: reason.to_string(),
            })
        };

        if self.name.trim().is_empty() {
            return reject("name must not be empty");
        }
        let rest = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"));
        match rest {
            None => reject("url must be absolute http(s)"),
            Some(host) if host.is_empty() || host.starts_with('/') => reject("url has no host"),
            Some(host) if host.chars().any(char::is_whitespace) => {
                reject("url must not contain whitespace")
            }
            Some(_) => Ok(()),
        }
    }
}

/// Validated, ordered set of hotspots. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<HitTarget>", into = "Vec<HitTarget>")]
pub struct HitTargets {
    targets: Vec<HitTarget>,
}

impl HitTargets {
    pub fn new(targets: Vec<HitTarget>) -> Result<Self> {
        for (i, target) in targets.iter().enumerate() {
            target.validate()?;
            if targets[..i].iter().any(|t| t.name == target.name) {
                return Err(ViewerError::HitTarget {
                    name: target.name.clone(),
                    reason: "duplicate name".to_string(),
                });
            }
        }
        Ok(Self { targets })
    }

    /// URL for a mesh name; unlisted names are not hotspots
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.targets
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.url.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HitTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for HitTargets {
    /// Social links attached to the bundled model
    fn default() -> Self {
        Self {
            targets: vec![
                HitTarget::new("Twitter", "https://twitter.com/with_bugs"),
                HitTarget::new(
                    "YouTube",
                    "https://www.youtube.com/channel/UCJZeq1xYxpLn_SlOUnQ8XOA",
                ),
                HitTarget::new("Instagram", "https://www.instagram.com/withbugs/"),
                HitTarget::new("GitHub", "https://github.com/withbugs"),
                HitTarget::new("Bot", "http://withbugsbot.azurewebsites.net/"),
            ],
        }
    }
}

impl TryFrom<Vec<HitTarget>> for HitTargets {
    type Error = ViewerError;

    fn try_from(targets: Vec<HitTarget>) -> Result<Self> {
        Self::new(targets)
    }
}

impl From<HitTargets> for Vec<HitTarget> {
    fn from(targets: HitTargets) -> Self {
        targets.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let defaults = HitTargets::default();
        assert_eq!(defaults.len(), 5);
        assert!(HitTargets::new(defaults.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn test_resolve() {
        let targets = HitTargets::default();
        assert_eq!(targets.resolve("Twitter"), Some("https://twitter.com/with_bugs"));
        assert_eq!(targets.resolve("GitHub"), Some("https://github.com/withbugs"));
        assert_eq!(targets.resolve("twitter"), None);
        assert_eq!(targets.resolve(""), None);
    }

    #[test]
    fn test_rejects_invalid_entries() {
        assert!(HitTargets::new(vec![HitTarget::new("", "https://a.example")]).is_err());
        assert!(HitTargets::new(vec![HitTarget::new("A", "ftp://a.example")]).is_err());
        assert!(HitTargets::new(vec![HitTarget::new("A", "https://")]).is_err());
        assert!(HitTargets::new(vec![HitTarget::new("A", "https://a b")]).is_err());

        let duplicate = vec![
            HitTarget::new("A", "https://a.example"),
            HitTarget::new("A", "https://b.example"),
        ];
        match HitTargets::new(duplicate) {
            Err(ViewerError::HitTarget { name, .. }) => assert_eq!(name, "A"),
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: HitTargets =
            serde_json::from_str(r#"[{"name": "Blog", "url": "https://blog.example/"}]"#).unwrap();
        assert_eq!(ok.resolve("Blog"), Some("https://blog.example/"));

        let bad = serde_json::from_str::<HitTargets>(r#"[{"name": "Blog", "url": "blog"}]"#);
        assert!(bad.is_err());
    }
}
