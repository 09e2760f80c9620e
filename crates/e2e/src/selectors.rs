//! Selector catalog
//!
//! Maps every semantic UI role of the Conduit frontend to an ordered list of
//! CSS locators, most specific first. When the frontend markup drifts, this
//! table (or the `[selectors]` section of the config file) is the only thing
//! that needs to change.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// An opaque element locator (a CSS selector understood by the driver).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, non-empty list of alternative locators for one logical element.
/// Earlier entries win ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSet {
    locators: Vec<Locator>,
}

impl LocatorSet {
    pub fn new<I, S>(selectors: I) -> E2eResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locators: Vec<Locator> = selectors
            .into_iter()
            .map(Into::<String>::into)
            .filter(|s| !s.trim().is_empty())
            .map(Locator)
            .collect();

        if locators.is_empty() {
            return Err(E2eError::Config("locator set must not be empty".into()));
        }
        Ok(Self { locators })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.locators.iter()
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl fmt::Display for LocatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, locator) in self.locators.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(locator.as_str())?;
        }
        Ok(())
    }
}

/// Semantic UI roles the journey interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Nav,
    Form,
    SignUpLink,
    LoginLink,
    LogoutControl,
    UsernameField,
    EmailField,
    PasswordField,
    SubmitButton,
    PostTitleField,
    PostDescriptionField,
    PostBodyField,
    TagInput,
    PublishButton,
    UserProfile,
    UserSettings,
    Tags,
    Articles,
    ArticleHeading,
    ErrorMessages,
}

impl Role {
    pub const ALL: [Role; 20] = [
        Role::Nav,
        Role::Form,
        Role::SignUpLink,
        Role::LoginLink,
        Role::LogoutControl,
        Role::UsernameField,
        Role::EmailField,
        Role::PasswordField,
        Role::SubmitButton,
        Role::PostTitleField,
        Role::PostDescriptionField,
        Role::PostBodyField,
        Role::TagInput,
        Role::PublishButton,
        Role::UserProfile,
        Role::UserSettings,
        Role::Tags,
        Role::Articles,
        Role::ArticleHeading,
        Role::ErrorMessages,
    ];

    /// Built-in locators for this role.
    pub fn default_locators(self) -> &'static [&'static str] {
        match self {
            Role::Nav => &["nav", ".navbar"],
            Role::Form => &["form"],
            Role::SignUpLink => &[
                r#"a[href="/register"]"#,
                r#"a[href*="register"]"#,
                r#"a.nav-link[href*="register"]"#,
            ],
            Role::LoginLink => &[r#"a[href="/login"]"#, r#"a[href*="login"]"#],
            Role::LogoutControl => &[
                r#"a[href*="logout"]"#,
                r#"button[class*="logout"]"#,
                ".logout-button",
            ],
            Role::UsernameField => &[
                r#"input[placeholder*="Username"]"#,
                r#"input[name*="username"]"#,
                r#"input[type="text"]:nth-of-type(1)"#,
            ],
            Role::EmailField => &[
                r#"input[placeholder*="Email"]"#,
                r#"input[type="email"]"#,
                r#"input[name*="email"]"#,
            ],
            Role::PasswordField => &[
                r#"input[placeholder*="Password"]"#,
                r#"input[type="password"]"#,
                r#"input[name*="password"]"#,
            ],
            Role::SubmitButton | Role::PublishButton => &[
                r#"button[type="submit"]"#,
                "button.btn-primary",
                "button",
            ],
            Role::PostTitleField => &[
                r#"input[placeholder*="Title"]"#,
                r#"input[placeholder*="Article Title"]"#,
            ],
            Role::PostDescriptionField => &[
                r#"input[placeholder*="about"]"#,
                r#"input[placeholder*="What's this article about"]"#,
            ],
            Role::PostBodyField => &[
                r#"textarea[placeholder*="article"]"#,
                r#"textarea[placeholder*="markdown"]"#,
                "textarea",
            ],
            Role::TagInput => &[
                r#"input[placeholder*="tags"]"#,
                r#"input[placeholder*="Enter tags"]"#,
            ],
            Role::UserProfile => &[".user-pic", ".avatar", "img.user-pic"],
            Role::UserSettings => &[
                r#"a[href*="settings"]"#,
                r#"a.nav-link[href*="settings"]"#,
            ],
            Role::Tags => &[
                ".tag-list .tag-pill",
                ".sidebar .tag-default",
                ".tag-list .tag-default",
            ],
            Role::Articles => &["div.article-preview", "article", ".article-preview"],
            Role::ArticleHeading => &["h1"],
            Role::ErrorMessages => &[
                ".error-messages",
                ".alert-danger",
                ".text-danger",
                ".error",
            ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the serde names so log lines match config keys.
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&name)
    }
}

/// Read-only role → locator set table. Built once at startup.
#[derive(Debug, Clone)]
pub struct SelectorCatalog {
    sets: HashMap<Role, LocatorSet>,
}

impl SelectorCatalog {
    /// Built-in table with optional per-role replacements.
    pub fn with_overrides(overrides: &HashMap<Role, Vec<String>>) -> E2eResult<Self> {
        let mut sets = HashMap::with_capacity(Role::ALL.len());

        for role in Role::ALL {
            let set = match overrides.get(&role) {
                Some(custom) => LocatorSet::new(custom.iter().cloned()).map_err(|_| {
                    E2eError::Config(format!("selector override for '{}' is empty", role))
                })?,
                None => LocatorSet::new(role.default_locators().iter().copied())?,
            };
            sets.insert(role, set);
        }

        Ok(Self { sets })
    }

    pub fn get(&self, role: Role) -> &LocatorSet {
        // Every role is populated by the constructor.
        &self.sets[&role]
    }
}

impl Default for SelectorCatalog {
    fn default() -> Self {
        let sets = Role::ALL
            .into_iter()
            .map(|role| {
                let locators = role
                    .default_locators()
                    .iter()
                    .map(|s| Locator::new(*s))
                    .collect();
                (role, LocatorSet { locators })
            })
            .collect();
        Self { sets }
    }
}
