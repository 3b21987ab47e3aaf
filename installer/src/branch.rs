//! Branch selector parsing.
//!
//! The installer takes a single selector token: one of the django-nonrel
//! release lines to install, or `--clean` to remove a previous install.
//! Tokens are accepted with or without their leading `--`.

use crate::error::{InstallerError, Result};
use std::fmt;
use std::str::FromStr;

/// Tokens listed back to the user when a selector is not recognised.
const DOCUMENTED_TOKENS: &[&str] = &["--master", "--dev13", "--dev14", "--dev15", "--clean"];

/// A django-nonrel release line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The old master branches of the 1.3 line. Deprecated.
    Master,
    /// The 1.3 development branches.
    Dev13,
    /// The 1.4 development branches.
    Dev14,
    /// The 1.5 development branches.
    Dev15,
}

impl Branch {
    /// Every supported branch, oldest first.
    pub const ALL: [Self; 4] = [Self::Master, Self::Dev13, Self::Dev14, Self::Dev15];

    /// Branch used when no selector is given.
    pub const DEFAULT: Self = Self::Master;

    /// Return the canonical command-line token for this branch.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Master => "--master",
            Self::Dev13 => "--dev13",
            Self::Dev14 => "--dev14",
            Self::Dev15 => "--dev15",
        }
    }

    /// Return a human-readable description of the branch set.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Master => "Master 1.3 branches",
            Self::Dev13 => "Development 1.3 branches",
            Self::Dev14 => "Development 1.4 branches",
            Self::Dev15 => "Development 1.5 branches",
        }
    }

    /// Whether selecting this branch should print a deprecation warning.
    #[must_use]
    pub const fn is_deprecated(self) -> bool {
        matches!(self, Self::Master)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What the installer has been asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Download and lay out the libraries of a branch.
    Install(Branch),
    /// Delete the install root.
    Clean,
}

impl Selector {
    /// Resolve an optional command-line token.
    ///
    /// `None` resolves to [`Branch::DEFAULT`]; the caller is expected to warn
    /// about the implicit choice.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnknownArgument`] for unrecognised tokens.
    pub fn resolve(token: Option<&str>) -> Result<Self> {
        token.map_or(Ok(Self::Install(Branch::DEFAULT)), str::parse::<Self>)
    }
}

impl FromStr for Selector {
    type Err = InstallerError;

    /// Parse a selector token.
    ///
    /// # Examples
    ///
    /// ```
    /// use nonrel_installer::branch::{Branch, Selector};
    ///
    /// let selector: Selector = "--dev14".parse().expect("valid selector");
    /// assert_eq!(selector, Selector::Install(Branch::Dev14));
    /// assert_eq!("clean".parse::<Selector>().ok(), Some(Selector::Clean));
    /// ```
    fn from_str(token: &str) -> Result<Self> {
        let word = token.strip_prefix("--").unwrap_or(token);
        match word {
            "clean" => Ok(Self::Clean),
            "master" => Ok(Self::Install(Branch::Master)),
            "dev13" | "dev" | "develop" => Ok(Self::Install(Branch::Dev13)),
            "dev14" => Ok(Self::Install(Branch::Dev14)),
            "dev15" => Ok(Self::Install(Branch::Dev15)),
            _ => Err(InstallerError::UnknownArgument {
                token: token.to_owned(),
                expected: DOCUMENTED_TOKENS.join(" "),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("--master", Selector::Install(Branch::Master))]
    #[case("--dev13", Selector::Install(Branch::Dev13))]
    #[case("--dev", Selector::Install(Branch::Dev13))]
    #[case("--develop", Selector::Install(Branch::Dev13))]
    #[case("--dev14", Selector::Install(Branch::Dev14))]
    #[case("dev14", Selector::Install(Branch::Dev14))]
    #[case("--dev15", Selector::Install(Branch::Dev15))]
    #[case("--clean", Selector::Clean)]
    #[case("clean", Selector::Clean)]
    fn parses_known_tokens(#[case] token: &str, #[case] expected: Selector) {
        let selector: Selector = token.parse().expect("token should parse");
        assert_eq!(selector, expected);
    }

    #[rstest]
    #[case("--bogus")]
    #[case("-dev14")]
    #[case("DEV14")]
    #[case("")]
    fn rejects_unknown_tokens(#[case] token: &str) {
        let err = token
            .parse::<Selector>()
            .expect_err("token should be rejected");
        match err {
            InstallerError::UnknownArgument {
                token: reported,
                expected,
            } => {
                assert_eq!(reported, token);
                assert!(expected.contains("--clean"));
                assert!(expected.contains("--dev15"));
            }
            other => panic!("expected UnknownArgument, got {other:?}"),
        }
    }

    #[test]
    fn missing_token_resolves_to_default_branch() {
        let selector = Selector::resolve(None).expect("default should resolve");
        assert_eq!(selector, Selector::Install(Branch::DEFAULT));
    }

    #[test]
    fn every_branch_token_round_trips() {
        for branch in Branch::ALL {
            let selector: Selector = branch.token().parse().expect("branch token");
            assert_eq!(selector, Selector::Install(branch));
        }
    }

    #[test]
    fn only_master_is_deprecated() {
        let deprecated: Vec<_> = Branch::ALL
            .into_iter()
            .filter(|b| b.is_deprecated())
            .collect();
        assert_eq!(deprecated, vec![Branch::Master]);
    }
}
