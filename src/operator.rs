//! Identity of the human operator who invoked funnelg.
use nix::unistd::{Group, User, getuid};

use crate::error::ProvisionError;

/// Account that should own service directories and run the units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    user: String,
    group: String,
}

impl Operator {
    /// Creates an operator from explicit names.
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }

    /// Resolves the operator from the values of `SUDO_USER` and `USER`.
    ///
    /// Under `sudo` the original account is preferred over root. When neither
    /// is set the account of the real uid is used. The group is the user's
    /// primary group when the passwd database knows the user, otherwise a group
    /// of the same name is assumed.
    pub fn resolve(
        sudo_user: Option<String>,
        user: Option<String>,
    ) -> Result<Self, ProvisionError> {
        let name = sudo_user
            .filter(|name| !name.is_empty())
            .or_else(|| user.filter(|name| !name.is_empty()));

        let name = match name {
            Some(name) => name,
            None => User::from_uid(getuid())
                .map_err(|err| ProvisionError::OperatorUnresolved(err.to_string()))?
                .map(|user| user.name)
                .ok_or_else(|| {
                    ProvisionError::OperatorUnresolved(
                        "SUDO_USER and USER are unset and the current uid has no passwd entry"
                            .into(),
                    )
                })?,
        };

        let group = primary_group(&name).unwrap_or_else(|| name.clone());
        Ok(Self { user: name, group })
    }

    /// Login name.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Group name.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// `user:group`, as accepted by `chown`.
    pub fn chown_spec(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }
}

fn primary_group(user_name: &str) -> Option<String> {
    let user = User::from_name(user_name).ok().flatten()?;
    let group = Group::from_gid(user.gid).ok().flatten()?;
    Some(group.name)
}
