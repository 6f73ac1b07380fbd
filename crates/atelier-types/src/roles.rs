//! Workshop roles and the bitset used for gate checks.
//!
//! Every workflow action is gated on a role. Users carry a [`RoleSet`], and
//! a gate passes when the set holds the required role or the admin role,
//! which passes every gate.

use serde::{Deserialize, Serialize};

/// Identifier of a directory user.
pub type UserId = String;

/// A role granted to a directory user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Passes every role gate
	Admin,
	/// Registers orders and owns customer contact
	Sales,
	/// Approves or rejects financial drafts
	Finance,
	/// Prints paintings
	Printing,
	/// Cuts frames
	FrameCutting,
	/// Mounts prints onto frames
	Production,
	/// Packs finished goods
	Packaging,
	/// Routes parcels to carriers
	Dispatch,
}

impl Role {
	/// Returns the canonical snake_case name of this role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::Sales => "sales",
			Role::Finance => "finance",
			Role::Printing => "printing",
			Role::FrameCutting => "frame_cutting",
			Role::Production => "production",
			Role::Packaging => "packaging",
			Role::Dispatch => "dispatch",
		}
	}

	/// Returns all roles in declaration order.
	pub fn all() -> &'static [Role] {
		&[
			Role::Admin,
			Role::Sales,
			Role::Finance,
			Role::Printing,
			Role::FrameCutting,
			Role::Production,
			Role::Packaging,
			Role::Dispatch,
		]
	}

	fn bit(&self) -> u16 {
		1 << (*self as u16)
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for Role {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Role::all()
			.iter()
			.find(|role| role.as_str() == s)
			.copied()
			.ok_or(())
	}
}

/// Set of roles held by a user, stored as a bitset.
///
/// Serializes as a plain list of role names so user documents stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(u16);

impl RoleSet {
	/// Creates an empty role set.
	pub fn new() -> Self {
		RoleSet(0)
	}

	/// Adds a role to the set.
	pub fn insert(&mut self, role: Role) {
		self.0 |= role.bit();
	}

	/// Returns true if the set holds exactly this role.
	pub fn contains(&self, role: Role) -> bool {
		self.0 & role.bit() != 0
	}

	/// Returns true if the set passes a gate requiring `role`.
	///
	/// Admin passes every gate.
	pub fn permits(&self, role: Role) -> bool {
		self.contains(role) || self.contains(Role::Admin)
	}

	/// Returns true if no role is set.
	pub fn is_empty(&self) -> bool {
		self.0 == 0
	}

	/// Iterates the roles present in the set.
	pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
		Role::all().iter().copied().filter(|role| self.contains(*role))
	}
}

impl FromIterator<Role> for RoleSet {
	fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
		let mut set = RoleSet::new();
		for role in iter {
			set.insert(role);
		}
		set
	}
}

impl From<Vec<Role>> for RoleSet {
	fn from(roles: Vec<Role>) -> Self {
		roles.into_iter().collect()
	}
}

impl From<RoleSet> for Vec<Role> {
	fn from(set: RoleSet) -> Self {
		set.iter().collect()
	}
}

/// A user known to the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
	/// Identifier the user acts under
	pub id: UserId,
	/// Display name
	pub name: String,
	/// Roles granted to the user
	pub roles: RoleSet,
}
