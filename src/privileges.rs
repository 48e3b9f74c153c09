use std::{
  fmt,
  ops::{BitAnd, BitOr, BitOrAssign},
};

use serde::{Deserialize, Serialize};

/// Bitmask of what a user account is allowed to do, as stored in `users.privileges`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserPrivileges(pub u64);

impl UserPrivileges {
  pub const USER_PUBLIC: Self = Self(1 << 0);
  pub const USER_NORMAL: Self = Self(1 << 1);
  pub const USER_DONOR: Self = Self(1 << 2);
  pub const ADMIN_ACCESS_RAP: Self = Self(1 << 3);
  pub const ADMIN_MANAGE_USERS: Self = Self(1 << 4);
  pub const ADMIN_BAN_USERS: Self = Self(1 << 5);
  pub const ADMIN_SILENCE_USERS: Self = Self(1 << 6);
  pub const ADMIN_WIPE_USERS: Self = Self(1 << 7);
  pub const ADMIN_MANAGE_BEATMAP: Self = Self(1 << 8);
  pub const ADMIN_MANAGE_SERVER: Self = Self(1 << 9);
  pub const ADMIN_MANAGE_SETTING: Self = Self(1 << 10);
  pub const ADMIN_MANAGE_BETA_KEY: Self = Self(1 << 11);
  pub const ADMIN_MANAGE_REPORT: Self = Self(1 << 12);
  pub const ADMIN_MANAGE_DOCS: Self = Self(1 << 13);
  pub const ADMIN_MANAGE_BADGES: Self = Self(1 << 14);
  pub const ADMIN_VIEW_RAP_LOGS: Self = Self(1 << 15);
  pub const ADMIN_MANAGE_PRIVILEGE: Self = Self(1 << 16);
  pub const ADMIN_SEND_ALERTS: Self = Self(1 << 17);
  pub const ADMIN_CHAT_MOD: Self = Self(1 << 18);
  pub const ADMIN_KICK_USERS: Self = Self(1 << 19);
  pub const USER_PENDING_VERIFICATION: Self = Self(1 << 20);
  pub const USER_TOURNAMENT_STAFF: Self = Self(1 << 21);
  pub const ADMIN_CAKER: Self = Self(1 << 22);
  pub const USER_PREMIUM: Self = Self(1 << 23);

  const NAMES: [&'static str; 24] = [
    "UserPublic",
    "UserNormal",
    "UserDonor",
    "AdminAccessRAP",
    "AdminManageUsers",
    "AdminBanUsers",
    "AdminSilenceUsers",
    "AdminWipeUsers",
    "AdminManageBeatmap",
    "AdminManageServer",
    "AdminManageSetting",
    "AdminManageBetaKey",
    "AdminManageReport",
    "AdminManageDocs",
    "AdminManageBadges",
    "AdminViewRAPLogs",
    "AdminManagePrivilege",
    "AdminSendAlerts",
    "AdminChatMod",
    "AdminKickUsers",
    "UserPendingVerification",
    "UserTournamentStaff",
    "AdminCaker",
    "UserPremium",
  ];

  pub const fn union(self, other: Self) -> Self { Self(self.0 | other.0) }

  pub fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }
}

/// Bitmask of what an API token may be used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privileges(pub u64);

impl Privileges {
  /// Deprecated; [`Privileges::can_only`] strips it from every token.
  pub const READ: Self = Self(1 << 0);
  pub const READ_CONFIDENTIAL: Self = Self(1 << 1);
  pub const WRITE: Self = Self(1 << 2);
  pub const MANAGE_BADGES: Self = Self(1 << 3);
  pub const BETA_KEYS: Self = Self(1 << 4);
  pub const MANAGE_SETTINGS: Self = Self(1 << 5);
  pub const VIEW_USER_ADVANCED: Self = Self(1 << 6);
  pub const MANAGE_USER: Self = Self(1 << 7);
  pub const MANAGE_ROLES: Self = Self(1 << 8);
  pub const MANAGE_API_KEYS: Self = Self(1 << 9);
  pub const BLOG: Self = Self(1 << 10);
  pub const API_META: Self = Self(1 << 11);
  pub const BEATMAP: Self = Self(1 << 12);

  /// Every token privilege.  Private tokens start from this and get trimmed by
  /// [`Privileges::can_only`].
  pub const ALL: Self = Self((Self::BEATMAP.0 << 1) - 1);

  const NAMES: [&'static str; 13] = [
    "Read",
    "ReadConfidential",
    "Write",
    "ManageBadges",
    "BetaKeys",
    "ManageSettings",
    "ViewUserAdvanced",
    "ManageUser",
    "ManageRoles",
    "ManageAPIKeys",
    "Blog",
    "APIMeta",
    "Beatmap",
  ];

  /// User privileges required to hold each token privilege, indexed by bit.
  const REQUIRED_USER_PRIVILEGES: [UserPrivileges; 13] = [
    // nobody holds bit 30
    UserPrivileges(1 << 30),
    UserPrivileges::USER_NORMAL,
    UserPrivileges::USER_NORMAL,
    UserPrivileges::ADMIN_ACCESS_RAP.union(UserPrivileges::ADMIN_MANAGE_BADGES),
    UserPrivileges::ADMIN_ACCESS_RAP.union(UserPrivileges::ADMIN_MANAGE_BETA_KEY),
    UserPrivileges::ADMIN_ACCESS_RAP.union(UserPrivileges::ADMIN_MANAGE_SETTING),
    UserPrivileges::ADMIN_ACCESS_RAP,
    UserPrivileges::ADMIN_ACCESS_RAP
      .union(UserPrivileges::ADMIN_MANAGE_USERS)
      .union(UserPrivileges::ADMIN_BAN_USERS),
    UserPrivileges::ADMIN_ACCESS_RAP
      .union(UserPrivileges::ADMIN_MANAGE_USERS)
      .union(UserPrivileges::ADMIN_MANAGE_PRIVILEGE),
    UserPrivileges::ADMIN_ACCESS_RAP
      .union(UserPrivileges::ADMIN_MANAGE_USERS)
      .union(UserPrivileges::ADMIN_MANAGE_SERVER),
    UserPrivileges::ADMIN_CHAT_MOD,
    UserPrivileges::ADMIN_MANAGE_SERVER,
    UserPrivileges::ADMIN_ACCESS_RAP.union(UserPrivileges::ADMIN_MANAGE_BEATMAP),
  ];

  pub fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }

  pub fn is_empty(self) -> bool { self.0 == 0 }

  /// Drops every privilege the token asks for that `user` isn't ranked high enough to have.
  pub fn can_only(self, user: UserPrivileges) -> Self {
    let granted = Self::REQUIRED_USER_PRIVILEGES
      .iter()
      .enumerate()
      .filter(|(bit, required)| self.0 & (1u64 << *bit) != 0 && user.contains(**required))
      .fold(0u64, |acc, (bit, _)| acc | (1u64 << bit));
    Self(granted)
  }

  /// Maps a space-separated list of OAuth scopes to token privileges.  Unknown scopes are ignored.
  pub fn from_oauth_scopes(scopes: &str) -> Self {
    scopes
      .split(' ')
      .fold(Self::default(), |acc, scope| match scope {
        "read_confidential" => acc | Self::READ_CONFIDENTIAL,
        "write" => acc | Self::WRITE,
        _ => acc,
      })
  }
}

impl BitOr for Privileges {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for Privileges {
  fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0 }
}

impl BitAnd for Privileges {
  type Output = Self;

  fn bitand(self, rhs: Self) -> Self { Self(self.0 & rhs.0) }
}

fn fmt_bit_names(bits: u64, names: &[&str], f: &mut fmt::Formatter<'_>) -> fmt::Result {
  let mut first = true;
  for (i, name) in names.iter().enumerate() {
    if bits & (1u64 << i) == 0 {
      continue;
    }
    if !first {
      f.write_str(", ")?;
    }
    f.write_str(name)?;
    first = false;
  }
  Ok(())
}

impl fmt::Display for Privileges {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_bit_names(self.0, &Self::NAMES, f)
  }
}

impl fmt::Display for UserPrivileges {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_bit_names(self.0, &Self::NAMES, f)
  }
}
