use std::{
    fmt::{self, Display},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::runtime::TemporaryVideoFile;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Platform {
    Youtube,
    Instagram,
    Twitter,
    Vk,
    Unsupported,
}

impl Platform {
    pub fn from_hostname(hostname: &str) -> Self {
        match hostname {
            "youtube.com" | "youtu.be" => Self::Youtube,
            "instagram.com" => Self::Instagram,
            "twitter.com" | "x.com" => Self::Twitter,
            "vk.com" => Self::Vk,
            _ => Self::Unsupported,
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Youtube => "YouTube",
            Self::Instagram => "Instagram",
            Self::Twitter => "X",
            Self::Vk => "VK",
            Self::Unsupported => "Unsupported",
        };
        f.write_str(name)
    }
}

/// A URL that went through classification. Shorthand links are already replaced by their target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUrl {
    pub raw_url: String,
    pub url: Url,
    pub normalized_hostname: String,
    pub platform: Platform,
}

impl ClassifiedUrl {
    pub fn is_supported(&self) -> bool {
        self.platform != Platform::Unsupported
    }
}

#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub url: Url,
    pub platform: Platform,
    /// `false` runs the admission check only; nothing is fetched.
    pub video_required: bool,
}

impl ResolutionRequest {
    pub fn preview(classified: &ClassifiedUrl) -> Self {
        Self {
            url: classified.url.clone(),
            platform: classified.platform,
            video_required: false,
        }
    }

    pub fn full(classified: &ClassifiedUrl) -> Self {
        Self {
            url: classified.url.clone(),
            platform: classified.platform,
            video_required: true,
        }
    }
}

/// Playable media produced by a successful attempt.
#[derive(Debug)]
pub enum ResolvedMedia {
    Remote { url: Url, proxied: bool },
    /// The file is owned by whoever holds this value and is deleted when dropped.
    Local(TemporaryVideoFile),
}

impl ResolvedMedia {
    pub fn proxied(&self) -> bool {
        matches!(self, Self::Remote { proxied: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooLong { duration: Duration, ceiling: Duration },
    Unsupported,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { duration, ceiling } => {
                write!(f, "too long ({}s > {}s)", duration.as_secs(), ceiling.as_secs())
            }
            Self::Unsupported => f.write_str("unsupported platform"),
        }
    }
}

#[derive(Debug)]
pub enum ResolutionOutcome {
    Resolved(ResolvedMedia),
    /// Admission passed for a preview request.
    Admitted,
    Rejected(Rejection),
    Exhausted { attempted: Vec<&'static str> },
}

#[derive(Debug)]
pub struct ResolutionResult {
    pub platform: Platform,
    pub outcome: ResolutionOutcome,
}

impl ResolutionResult {
    pub fn new(platform: Platform, outcome: ResolutionOutcome) -> Self {
        Self { platform, outcome }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Resolved(_) | ResolutionOutcome::Admitted)
    }

    pub fn proxied(&self) -> bool {
        match &self.outcome {
            ResolutionOutcome::Resolved(media) => media.proxied(),
            _ => false,
        }
    }
}

#[cfg(test)]
impl ResolutionResult {
    pub fn remote_url(&self) -> Option<&Url> {
        match &self.outcome {
            ResolutionOutcome::Resolved(ResolvedMedia::Remote { url, .. }) => Some(url),
            _ => None,
        }
    }

    pub fn local_file(&self) -> Option<&TemporaryVideoFile> {
        match &self.outcome {
            ResolutionOutcome::Resolved(ResolvedMedia::Local(file)) => Some(file),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_hostname() {
        assert_eq!(Platform::from_hostname("youtube.com"), Platform::Youtube);
        assert_eq!(Platform::from_hostname("youtu.be"), Platform::Youtube);
        assert_eq!(Platform::from_hostname("instagram.com"), Platform::Instagram);
        assert_eq!(Platform::from_hostname("twitter.com"), Platform::Twitter);
        assert_eq!(Platform::from_hostname("x.com"), Platform::Twitter);
        assert_eq!(Platform::from_hostname("vk.com"), Platform::Vk);
        assert_eq!(Platform::from_hostname("m.youtube.com"), Platform::Unsupported);
        assert_eq!(Platform::from_hostname("vimeo.com"), Platform::Unsupported);
    }

    #[test]
    fn test_result_accessors_follow_outcome() {
        let url = Url::parse("https://cdn.example.com/v.mp4").unwrap();
        let remote = ResolutionResult::new(
            Platform::Twitter,
            ResolutionOutcome::Resolved(ResolvedMedia::Remote {
                url: url.clone(),
                proxied: true,
            }),
        );

        assert!(remote.is_success());
        assert!(remote.proxied());
        assert_eq!(remote.remote_url(), Some(&url));
        assert!(remote.local_file().is_none());

        let exhausted = ResolutionResult::new(
            Platform::Twitter,
            ResolutionOutcome::Exhausted {
                attempted: vec!["direct", "proxied"],
            },
        );
        assert!(!exhausted.is_success());
        assert!(exhausted.remote_url().is_none());
        assert!(exhausted.local_file().is_none());

        let admitted = ResolutionResult::new(Platform::Vk, ResolutionOutcome::Admitted);
        assert!(admitted.is_success());
        assert!(admitted.remote_url().is_none() && admitted.local_file().is_none());
    }
}
