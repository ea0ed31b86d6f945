/// Client identification presented by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub languages: Vec<String>,
}

impl Default for UserAgentProfile {
    fn default() -> Self {
        Self::desktop_chrome()
    }
}

impl UserAgentProfile {
    /// A current desktop Chrome on Windows at full HD, the profile the
    /// dashboard renders its full table for.
    pub fn desktop_chrome() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            viewport: (1920, 1080),
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_desktop_chrome_profile() {
        let profile = UserAgentProfile::default();
        assert_eq!(profile, UserAgentProfile::desktop_chrome());
        assert_eq!(profile.viewport, (1920, 1080));
        assert!(profile.user_agent.contains("Chrome/"));
        assert_eq!(profile.languages[0], "en-US");
    }
}
