//! Entity kind registry
//!
//! The declaration order of [`EntityKind`] is the canonical export order.
//! A kind may only reference kinds declared before it, or itself. Changing
//! the order or a tag breaks compatibility with existing dumps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    RemoteSource,
    User,
    LinkedAccount,
    Organization,
    OrganizationMember,
    ProjectGroup,
    Project,
    Secret,
    Variable,
}

impl EntityKind {
    /// Every kind, in export order
    pub const EXPORT_ORDER: [EntityKind; 9] = [
        EntityKind::RemoteSource,
        EntityKind::User,
        EntityKind::LinkedAccount,
        EntityKind::Organization,
        EntityKind::OrganizationMember,
        EntityKind::ProjectGroup,
        EntityKind::Project,
        EntityKind::Secret,
        EntityKind::Variable,
    ];

    /// Stable tag used in store keys and dump frames
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::RemoteSource => "remotesource",
            EntityKind::User => "user",
            EntityKind::LinkedAccount => "linkedaccount",
            EntityKind::Organization => "organization",
            EntityKind::OrganizationMember => "organizationmember",
            EntityKind::ProjectGroup => "projectgroup",
            EntityKind::Project => "project",
            EntityKind::Secret => "secret",
            EntityKind::Variable => "variable",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::EXPORT_ORDER.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Kinds this kind is allowed to reference
    pub fn referenceable(&self) -> &'static [EntityKind] {
        use EntityKind::*;
        match self {
            RemoteSource | User => &[],
            LinkedAccount => &[User, RemoteSource],
            Organization => &[User],
            OrganizationMember => &[Organization, User],
            ProjectGroup => &[Organization, User, ProjectGroup],
            Project => &[ProjectGroup, RemoteSource, LinkedAccount],
            Secret | Variable => &[ProjectGroup, Project],
        }
    }

    pub fn may_reference(&self, target: EntityKind) -> bool {
        self.referenceable().contains(&target)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown entity kind '{}'", s))
    }
}
